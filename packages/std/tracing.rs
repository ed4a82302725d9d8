use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Initialize tracing from the filter held by `var_name`. Set `{var_name}_FORMAT=json` for JSON output.
pub fn setup(var_name: &str) {
	// Parse the filter. Tracing stays off when the variable is unset or invalid.
	let Some(targets_layer) = std::env::var(var_name)
		.ok()
		.and_then(|filter| filter.parse::<tracing_subscriber::filter::Targets>().ok())
	else {
		return;
	};

	let json = std::env::var(format!("{var_name}_FORMAT")).is_ok_and(|format| format == "json");
	let registry = tracing_subscriber::registry().with(targets_layer);
	if json {
		let format_layer = tracing_subscriber::fmt::layer()
			.json()
			.with_writer(std::io::stderr);
		registry.with(format_layer).init();
	} else {
		let format_layer = tracing_subscriber::fmt::layer()
			.compact()
			.with_ansi(false)
			.with_target(false)
			.with_span_events(tracing_subscriber::fmt::format::FmtSpan::NEW)
			.with_writer(std::io::stderr);
		registry.with(format_layer).init();
	}
}

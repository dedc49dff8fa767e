use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, reload};
use waveroom_core::{
	Result,
	config::Config,
	err,
	log::{LogLevelReloadHandles, fmt_span},
};

pub(crate) fn init(config: &Config) -> Result<LogLevelReloadHandles> {
	let reload_handles = LogLevelReloadHandles::default();

	let console_span_events = fmt_span::from_str(&config.log_span_events);

	let console_filter = EnvFilter::builder()
		.with_regex(config.log_filter_regex)
		.parse(&config.log)
		.map_err(|e| err!(Config("log", "{e}.")))?;

	let console_layer = fmt::Layer::new()
		.with_ansi(config.log_colors)
		.with_thread_ids(config.log_thread_ids)
		.with_span_events(console_span_events);

	let (console_reload_filter, console_reload_handle) = reload::Layer::new(console_filter);

	reload_handles.add("console", Box::new(console_reload_handle));

	let subscriber = Registry::default().with(console_layer.with_filter(console_reload_filter));

	set_global_default(subscriber);

	Ok(reload_handles)
}

fn set_global_default<S: SubscriberExt + Send + Sync>(subscriber: S) {
	tracing::subscriber::set_global_default(subscriber)
		.expect("the global default tracing subscriber failed to be initialized");
}

pub use alert_fanout_core::{
    chunk, config, contract, dispatcher, error, flow, registry, severity,
};

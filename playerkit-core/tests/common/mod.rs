//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use playerkit_core::{
    Context, EventHandlerFn, Payload, Plugin, PluginBase, Provider, WeakContext, handler,
};

/// Ordered record of lifecycle hooks and handler invocations
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Drain and return everything recorded so far
pub fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

/// Entries recorded so far, without draining
pub fn snapshot(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn label(context: &dyn Context) -> String {
    context.name().unwrap_or("?").to_string()
}

pub trait SpeedService: Send + Sync {
    fn rate(&self) -> f64;
    fn scope_name(&self) -> Option<String>;
}

pub trait VolumeService: Send + Sync {
    fn level(&self) -> u8;
}

pub trait DanmakuService: Send + Sync {
    fn enabled(&self) -> bool;
}

macro_rules! logging_plugin {
    ($name:ident, $tag:literal) => {
        pub struct $name {
            pub base: PluginBase,
            log: Log,
        }

        impl $name {
            pub fn new(log: &Log) -> Self {
                log.lock().unwrap().push(format!("{}:new", $tag));
                Self {
                    base: PluginBase::new(),
                    log: Arc::clone(log),
                }
            }

            fn record(&self, what: impl AsRef<str>) {
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", $tag, what.as_ref()));
            }
        }

        impl Plugin for $name {
            fn bind_context(&self, context: Option<WeakContext>) {
                self.record(if context.is_some() { "bind" } else { "unbind" });
                self.base.bind(context);
            }

            fn configure(&self, payload: &Payload) {
                self.record("configure");
                self.base.set_config(payload);
            }

            fn on_load(&self, context: &dyn Context) {
                self.record(format!("load@{}", label(context)));
            }

            fn on_unload(&self, context: &dyn Context) {
                self.record(format!("unload@{}", label(context)));
            }

            fn on_attached_to_parent(&self, parent: &dyn Context) {
                self.record(format!("attached->{}", label(parent)));
            }

            fn on_detaching_from_parent(&self, parent: &dyn Context) {
                self.record(format!("detaching->{}", label(parent)));
            }

            fn on_child_attached(&self, child: &dyn Context) {
                self.record(format!("child+{}", label(child)));
            }

            fn on_child_detaching(&self, child: &dyn Context) {
                self.record(format!("child-{}", label(child)));
            }

            fn on_extended(&self, base: &dyn Context) {
                self.record(format!("extends->{}", label(base)));
            }

            fn on_unextending(&self, base: &dyn Context) {
                self.record(format!("unextends->{}", label(base)));
            }
        }
    };
}

logging_plugin!(SpeedPlugin, "speed");
logging_plugin!(VolumePlugin, "volume");
logging_plugin!(DanmakuPlugin, "danmaku");

impl SpeedService for SpeedPlugin {
    fn rate(&self) -> f64 {
        self.base.config::<f64>().map_or(1.0, |rate| *rate)
    }

    fn scope_name(&self) -> Option<String> {
        self.base
            .context()
            .and_then(|context| context.name().map(str::to_string))
    }
}

impl VolumeService for VolumePlugin {
    fn level(&self) -> u8 {
        self.base.config::<u8>().map_or(50, |level| *level)
    }
}

impl DanmakuService for DanmakuPlugin {
    fn enabled(&self) -> bool {
        true
    }
}

pub fn speed_provider(log: &Log) -> Provider {
    let log = Arc::clone(log);
    Provider::with_factory(
        move || SpeedPlugin::new(&log),
        |p: Arc<SpeedPlugin>| p as Arc<dyn SpeedService>,
    )
}

pub fn volume_provider(log: &Log) -> Provider {
    let log = Arc::clone(log);
    Provider::with_factory(
        move || VolumePlugin::new(&log),
        |p: Arc<VolumePlugin>| p as Arc<dyn VolumeService>,
    )
}

pub fn danmaku_provider(log: &Log) -> Provider {
    let log = Arc::clone(log);
    Provider::with_factory(
        move || DanmakuPlugin::new(&log),
        |p: Arc<DanmakuPlugin>| p as Arc<dyn DanmakuService>,
    )
}

/// Handler that records `"<event>"` or `"<event>=<u32 payload>"`
pub fn recorder(log: &Log) -> EventHandlerFn {
    let log = Arc::clone(log);
    handler(move |payload, event| {
        let entry = match payload.and_then(|p| p.downcast_ref::<u32>()) {
            Some(value) => format!("{event}={value}"),
            None => event.to_string(),
        };
        log.lock().unwrap().push(entry);
    })
}

/// Handler that records `"<tag>:<event>"`
pub fn tagged(log: &Log, tag: &'static str) -> EventHandlerFn {
    let log = Arc::clone(log);
    handler(move |_, event| log.lock().unwrap().push(format!("{tag}:{event}")))
}

use crate::config::QueueConfig;
use crate::errors::Result;
use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, RwLock},
};

use super::GradingQueue;
use super::backends::{memory::MemoryGradingQueue, redis::RedisGradingQueue};

pub type BoxedGradingQueueFuture =
    Pin<Box<dyn Future<Output = Result<Box<dyn GradingQueue>>> + Send>>;
pub type GradingQueueConstructor =
    Arc<dyn Fn(QueueConfig) -> BoxedGradingQueueFuture + Send + Sync>;

fn memory_constructor(config: QueueConfig) -> BoxedGradingQueueFuture {
    Box::pin(async move {
        Ok(Box::new(MemoryGradingQueue::new(config.capacity)) as Box<dyn GradingQueue>)
    })
}

fn redis_constructor(config: QueueConfig) -> BoxedGradingQueueFuture {
    Box::pin(async move {
        let queue = RedisGradingQueue::connect(&config.redis).await?;
        Ok(Box::new(queue) as Box<dyn GradingQueue>)
    })
}

static QUEUE_REGISTRY: Lazy<RwLock<HashMap<String, GradingQueueConstructor>>> = Lazy::new(|| {
    let mut registry: HashMap<String, GradingQueueConstructor> = HashMap::new();
    registry.insert("memory".to_string(), Arc::new(memory_constructor));
    registry.insert("redis".to_string(), Arc::new(redis_constructor));
    RwLock::new(registry)
});

pub fn register_queue_plugin<S: Into<String>>(name: S, constructor: GradingQueueConstructor) {
    let name = name.into();
    let mut registry = QUEUE_REGISTRY
        .write()
        .expect("Queue registry lock poisoned");
    registry.insert(name, constructor);
}

pub fn get_queue_plugin(name: &str) -> Option<GradingQueueConstructor> {
    QUEUE_REGISTRY
        .read()
        .expect("Queue registry lock poisoned")
        .get(name)
        .cloned()
}

pub fn debug_queue_registry() {
    let registry = QUEUE_REGISTRY
        .read()
        .expect("Queue registry lock poisoned");
    if registry.is_empty() {
        tracing::debug!("No queue plugins registered.");
    } else {
        tracing::debug!("Registered queue plugins:");
        for key in registry.keys() {
            tracing::debug!(" - {}", key);
        }
    }
}

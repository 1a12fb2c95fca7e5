use async_trait::async_trait;
use concierge_core::notify::{EmailMessage, Notifier};
use concierge_core::repository::RepoError;
use concierge_shared::models::events::{DomainEvent, EMAIL_TOPIC};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!("Sent message to {}/{}: partition {} offset {}", topic, key, delivery.partition, delivery.offset);
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

/// Hands emails to the mail relay's topic and domain events to theirs.
pub struct KafkaNotifier {
    producer: EventProducer,
}

impl KafkaNotifier {
    pub fn new(producer: EventProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), RepoError> {
        let payload = serde_json::to_string(message)?;
        let key = message.booking_id.map(|id| id.to_string()).unwrap_or_default();
        self.producer.publish(EMAIL_TOPIC, &key, &payload).await?;
        Ok(())
    }

    async fn publish(&self, event: &DomainEvent) -> Result<(), RepoError> {
        let payload = serde_json::to_string(event)?;
        self.producer.publish(event.topic(), &event.key(), &payload).await?;
        Ok(())
    }
}

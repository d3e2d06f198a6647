use crate::{assets::AssetStorage, config::ServerConfig, error::ModerationResult};
use async_trait::async_trait;

pub const TEST_SECRET: &str = "test-secret-0123456789abcdef0123456789";

pub fn test_config() -> ServerConfig {
    ServerConfig::from_vars(|key| match key {
        "MODERATION_JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "MODERATION_DATA_DIRECTORY" => Some(std::env::temp_dir().display().to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Storage that accepts everything and keeps nothing
pub struct NullAssets;

#[async_trait]
impl AssetStorage for NullAssets {
    async fn put(&self, _storage_id: &str, _data: &[u8]) -> ModerationResult<()> {
        Ok(())
    }

    async fn relocate(&self, _from: &str, _to: &str) -> ModerationResult<()> {
        Ok(())
    }

    async fn delete(&self, _storage_id: &str) -> ModerationResult<()> {
        Ok(())
    }

    fn public_url(&self, storage_id: &str) -> String {
        format!("https://cdn.example.com/{}", storage_id)
    }
}

/// Poll until `done` holds; side effects land on spawned tasks
pub async fn eventually(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

mod chat;
mod composer;
mod config;
mod credentials;
mod i18n;
mod llm;
mod transcript;

use std::env;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::chat::chat_loop;
use crate::composer::Conversation;
use crate::config::Config;
use crate::credentials::{API_KEY_VAR, KeyFile, KeySource, prompt_stdin, resolve_api_key};
use crate::i18n::{Language, MessageKey, t};
use crate::llm::gemini::GeminiClient;

fn main() -> Result<()> {
    // RUST_LOG overrides; stderr keeps logs out of the conversation.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gemchat=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load()?;
    let lang = Language::from_str(&config.preference.detect_lang());

    let key_file = KeyFile::new(".env");
    let (api_key, source) = resolve_api_key(
        env::var(API_KEY_VAR).ok(),
        config.llm.api_key.clone(),
        &key_file,
        &mut || prompt_stdin(t(&lang, MessageKey::EnterApiKey)),
    )?;
    if source == KeySource::Prompt {
        println!("{}", t(&lang, MessageKey::KeyFileCreated));
    }
    info!(?source, "api key resolved");

    let model = config.llm.resolved_model();
    let client = GeminiClient::new(
        api_key,
        model.clone(),
        config.llm.resolved_base_url(),
        config.llm.timeout(),
    )?;
    println!("{}", t(&lang, MessageKey::ClientConfigured));
    info!(%model, "gemini client ready");

    let mut conversation =
        Conversation::new(Box::new(client)).with_rollback_on_failure(config.chat.rollback_on_failure);

    chat_loop(&mut conversation, &lang)
}

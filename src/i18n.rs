#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn from_str(s: &str) -> Self {
        let s = s.to_lowercase();
        if s.starts_with("zh") {
            Language::Zh
        } else {
            Language::En
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MessageKey {
    WelcomeMessage,
    ExitHint,
    PromptUser,
    PromptAssistant,
    Generating,
    Goodbye,
    SessionTerminated,
    EnterApiKey,
    KeyFileCreated,
    ClientConfigured,
}

pub fn t(lang: &Language, key: MessageKey) -> &'static str {
    match (lang, key) {
        // Startup banner
        (Language::En, MessageKey::WelcomeMessage) => "Welcome to the Gemini Command Line Chatbot!",
        (Language::Zh, MessageKey::WelcomeMessage) => "欢迎使用 Gemini 命令行聊天机器人！",

        (Language::En, MessageKey::ExitHint) => "Type 'exit' to end the conversation.",
        (Language::Zh, MessageKey::ExitHint) => "输入 'exit' 结束对话。",

        // User input prompt
        (Language::En, MessageKey::PromptUser) => "You: ",
        (Language::Zh, MessageKey::PromptUser) => "你: ",

        // Reply prefix
        (Language::En, MessageKey::PromptAssistant) => "Gemini: ",
        (Language::Zh, MessageKey::PromptAssistant) => "Gemini: ",

        (Language::En, MessageKey::Generating) => "Generating response...",
        (Language::Zh, MessageKey::Generating) => "正在生成回复...",

        // Exit paths
        (Language::En, MessageKey::Goodbye) => "Goodbye!",
        (Language::Zh, MessageKey::Goodbye) => "再见！",

        (Language::En, MessageKey::SessionTerminated) => "Chatbot session terminated.",
        (Language::Zh, MessageKey::SessionTerminated) => "聊天会话已终止。",

        // Credential setup
        (Language::En, MessageKey::EnterApiKey) => "Enter your Gemini API key: ",
        (Language::Zh, MessageKey::EnterApiKey) => "请输入您的 Gemini API 密钥: ",

        (Language::En, MessageKey::KeyFileCreated) => ".env file created with the API key.",
        (Language::Zh, MessageKey::KeyFileCreated) => "已创建包含 API 密钥的 .env 文件。",

        (Language::En, MessageKey::ClientConfigured) => "Gemini client configured successfully.",
        (Language::Zh, MessageKey::ClientConfigured) => "Gemini 客户端配置成功。",
    }
}

//! Telegram Bot API alert sink and reply source
//!
//! `TelegramSink` posts HTML alerts through `sendMessage` and returns the
//! Telegram `message_id` as the delivery handle. `TelegramReplies` polls
//! `getUpdates` with an advancing offset and yields messages from the
//! configured chat only. Updates queued before startup are acknowledged
//! once and never returned.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::adapters::errors::{DispatchError, DispatchResult, FetchError, FetchResult};
use crate::adapters::traits::{AlertSink, DeliveryHandle, Reply, ReplySource};
use crate::core::scoring::SourceMode;
use crate::core::types::{BuySellRatio, ScoredCandidate, Source};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub disable_preview: bool,
    pub request_timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            disable_preview: false,
            request_timeout: Duration::from_secs(15),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base.trim_end_matches('/'), self.bot_token, method)
    }

    /// Keep the bot token out of error messages; reqwest errors embed the URL.
    fn scrub(&self, message: String) -> String {
        if self.bot_token.is_empty() {
            message
        } else {
            message.replace(&self.bot_token, "<redacted>")
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// =============================================================================
// Alert sink
// =============================================================================

pub struct TelegramSink {
    config: TelegramConfig,
    http_client: reqwest::Client,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> Self {
        let http_client = build_client(config.request_timeout);
        Self {
            config,
            http_client,
        }
    }

    /// Send a free-form HTML message, e.g. the startup notice.
    pub async fn send_text(&self, text: &str) -> DispatchResult<DeliveryHandle> {
        let body = json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": self.config.disable_preview,
        });

        let response = self
            .http_client
            .post(self.config.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| match DispatchError::from(e) {
                DispatchError::Http(msg) => DispatchError::Http(self.config.scrub(msg)),
                other => other,
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;
        if json.get("ok").and_then(Value::as_bool) != Some(true) {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        json.get("result")
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64)
            .map(|id| DeliveryHandle(id.to_string()))
            .ok_or_else(|| DispatchError::InvalidResponse("missing result.message_id".to_string()))
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn dispatch(&self, winner: &ScoredCandidate) -> DispatchResult<DeliveryHandle> {
        self.send_text(&format_alert(winner)).await
    }
}

/// Escape the three characters Telegram's HTML mode reserves.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn signed_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.1}%", v),
        None => "n/a".to_string(),
    }
}

/// Render the alert body for one winner.
pub fn format_alert(winner: &ScoredCandidate) -> String {
    let r = &winner.record;
    let mut lines = vec![
        "🚀 <b>HIGH-QUALITY SIGNAL</b>".to_string(),
        String::new(),
        format!("<b>Token:</b> {}", escape_html(&r.display_symbol)),
        format!("<b>Price:</b> ${:.8}", r.price),
        format!("<b>Score:</b> {:.1} ({})", winner.score, r.source),
        String::new(),
        "<b>📊 Performance:</b>".to_string(),
        format!("• 1h: {}", signed_pct(r.price_change_1h_pct)),
        format!("• 6h: {}", signed_pct(r.price_change_6h_pct)),
        format!("• 24h: {}", signed_pct(r.price_change_24h_pct)),
        String::new(),
        "<b>💰 Fundamentals:</b>".to_string(),
        format!("• Market Cap: ${:.0}", r.market_cap_usd),
        format!("• Liquidity: ${:.0}", r.liquidity_usd),
        format!("• Volume 24h: ${:.0}", r.volume_24h_usd),
    ];

    if let Some(holders) = r.holder_count {
        lines.push(String::new());
        lines.push("<b>👥 Holder Metrics:</b>".to_string());
        lines.push(format!("• Total Holders: {}", holders));
        if r.has_holder_baseline() {
            lines.push(format!("• 24h Growth: {:+} holders", r.holder_growth()));
        }
    }

    lines.push(String::new());
    lines.push("<b>📈 Buy Pressure:</b>".to_string());
    match winner.buy_sell_ratio() {
        BuySellRatio::Ratio(ratio) => {
            lines.push(format!("• Buy/Sell Ratio: {:.2}x", ratio));
            if ratio > 2.0 {
                lines.push("• 🔥 Strong buying pressure!".to_string());
            } else if ratio > 1.0 {
                lines.push("• ✅ More buyers than sellers".to_string());
            }
        }
        BuySellRatio::NoSellData => lines.push("• Buy/Sell Ratio: no sell data".to_string()),
    }

    if !winner.signals.is_empty() {
        lines.push(String::new());
        lines.push("<b>✅ Signals:</b>".to_string());
        for signal in &winner.signals {
            lines.push(format!("• {}", escape_html(signal)));
        }
    }

    lines.push(String::new());
    lines.push(format!("<b>🔗 Chart:</b> {}", r.chart_url));
    lines.push(String::new());
    lines.push(format!("<b>Address:</b> <code>{}</code>", escape_html(&r.asset_id)));
    lines.push(String::new());
    lines.push("<i>Reply YES to buy or NO to skip</i>".to_string());

    lines.join("\n")
}

/// Render the notice sent once at startup.
pub fn format_startup_notice(sources: &[(Source, SourceMode)], bullish_threshold: f64, cooldown_secs: u64) -> String {
    let mut lines = vec![
        "🤖 <b>Solana Scanner Active!</b>".to_string(),
        String::new(),
        "<b>Sources:</b>".to_string(),
    ];
    for (source, mode) in sources {
        lines.push(format!("• {} ({})", source, mode));
    }
    lines.push(String::new());
    lines.push(format!("• Minimum score: {:.1}", bullish_threshold));
    lines.push(format!("• At most one alert every {} min", cooldown_secs.div_ceil(60)));
    lines.push(String::new());
    lines.push("📊 Quality over quantity!".to_string());
    lines.join("\n")
}

// =============================================================================
// Reply source
// =============================================================================

pub struct TelegramReplies {
    config: TelegramConfig,
    http_client: reqwest::Client,
    /// Next `update_id` to request; everything below is acknowledged
    offset: i64,
}

impl TelegramReplies {
    pub fn new(config: TelegramConfig) -> Self {
        let http_client = build_client(config.request_timeout);
        Self {
            config,
            http_client,
            offset: 0,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

fn chat_matches(chat_id: Option<&Value>, expected: &str) -> bool {
    match chat_id {
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::String(s)) => s == expected,
        _ => false,
    }
}

/// Extract replies from a `getUpdates` result and the highest update id seen.
pub fn parse_updates(result: &[Value], chat_id: &str) -> (Vec<Reply>, Option<i64>) {
    let mut replies = Vec::new();
    let mut max_update = None;

    for update in result {
        if let Some(id) = update.get("update_id").and_then(Value::as_i64) {
            max_update = Some(max_update.map_or(id, |m: i64| m.max(id)));
        }
        let Some(message) = update.get("message") else {
            continue;
        };
        if !chat_matches(message.get("chat").and_then(|c| c.get("id")), chat_id) {
            continue;
        }
        let Some(text) = message.get("text").and_then(Value::as_str) else {
            continue;
        };
        let reply_to = message
            .get("reply_to_message")
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64)
            .map(|id| DeliveryHandle(id.to_string()));

        replies.push(Reply {
            text: text.to_string(),
            reply_to,
            message_id: message.get("message_id").and_then(Value::as_i64),
        });
    }

    (replies, max_update)
}

impl TelegramReplies {
    async fn get_updates(&self, offset: i64) -> FetchResult<Vec<Value>> {
        let response = self
            .http_client
            .get(self.config.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", "0".to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .send()
            .await
            .map_err(|e| match FetchError::from(e) {
                FetchError::Http(msg) => FetchError::Http(self.config.scrub(msg)),
                other => other,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        json.get("result")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| FetchError::InvalidResponse("missing result".to_string()))
    }
}

#[async_trait]
impl ReplySource for TelegramReplies {
    /// `offset=-1` returns only the newest update and drops the rest;
    /// advancing past it acknowledges that one too.
    async fn skip_backlog(&mut self) -> FetchResult<usize> {
        let result = self.get_updates(-1).await?;
        if let Some(last) = result.iter().filter_map(|u| u.get("update_id").and_then(Value::as_i64)).max() {
            self.offset = last + 1;
        }
        debug!(skipped = result.len(), offset = self.offset, "Skipped Telegram backlog");
        Ok(result.len())
    }

    async fn poll_replies(&mut self) -> FetchResult<Vec<Reply>> {
        let result = self.get_updates(self.offset).await?;

        let (replies, max_update) = parse_updates(&result, &self.config.chat_id);
        if let Some(max) = max_update {
            self.offset = max + 1;
        }
        debug!(updates = result.len(), replies = replies.len(), offset = self.offset, "Polled Telegram updates");
        Ok(replies)
    }
}

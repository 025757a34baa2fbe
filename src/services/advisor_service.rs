use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::LlmError;
use crate::models::{PortfolioView, Transaction};

/// Configuration for the AI advisor
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, max_tokens: usize, temperature: f32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, model, max_tokens, temperature, client }
    }

    async fn call_openai_with_retry(&self, request: OpenAiRequest) -> Result<OpenAiResponse, LlmError> {
        let mut retry_count = 0;
        let max_retries = 3;
        let mut delay = Duration::from_secs(1);

        loop {
            match self.call_openai(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= max_retries {
                        error!("OpenAI API call failed after {} retries: {}", max_retries, e);
                        return Err(e);
                    }

                    warn!("OpenAI API call failed (attempt {}/{}): {}. Retrying in {:?}...",
                          retry_count, max_retries, e, delay);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    async fn call_openai(&self, request: &OpenAiRequest) -> Result<OpenAiResponse, LlmError> {
        let response = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
        }

        response.json::<OpenAiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError> {
        info!("Generating LLM completion (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage { role: "system".to_string(), content: system.to_string() },
                OpenAiMessage { role: "user".to_string(), content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.call_openai_with_retry(request).await?;

        let content = response.choices
            .first()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?
            .message
            .content
            .clone();

        if let Some(usage) = response.usage {
            info!("LLM completion generated. Tokens: {} prompt + {} completion = {} total",
                  usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
        }

        Ok(content)
    }
}

const SYSTEM_PROMPT: &str = "You are an experienced investment advisor providing personalized \
portfolio analysis. Analyze composition, diversification, and risk; comment on individual \
holdings and their performance; highlight concerning trends or opportunities. Always include \
the disclaimers that this is educational information rather than personalized financial \
advice, that a licensed advisor should be consulted, and that past performance does not \
guarantee future results.";

/// Narrative portfolio commentary. Without an API key the advisor is simply
/// disabled and says so, rather than failing the request.
pub struct AdvisorService {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl AdvisorService {
    pub fn new(config: AdvisorConfig) -> Self {
        let provider = config.api_key.clone().map(|key| {
            Arc::new(OpenAiProvider::new(
                key,
                config.model.clone(),
                config.max_tokens,
                config.temperature,
            )) as Arc<dyn LlmProvider>
        });
        Self { provider }
    }

    #[cfg(test)]
    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    pub async fn analyze_portfolio(
        &self,
        view: &PortfolioView,
        recent_transactions: &[Transaction],
    ) -> Result<String, LlmError> {
        let Some(provider) = &self.provider else {
            return Ok("AI advisor is not configured. Set OPENAI_API_KEY to enable this feature."
                .to_string());
        };

        let context = build_portfolio_context(view, recent_transactions);
        let prompt = format!("Please analyze my investment portfolio and provide advice:\n\n{context}");
        provider.generate_completion(SYSTEM_PROMPT, prompt).await
    }
}

fn money(value: &bigdecimal::BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn build_portfolio_context(view: &PortfolioView, transactions: &[Transaction]) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("## Portfolio Summary".to_string());
    parts.push(format!("- Total Value: ${:.2} CAD", money(&view.total_value)));
    parts.push(format!("- Total Cost: ${:.2} CAD", money(&view.total_cost)));
    parts.push(format!("- Total Gain/Loss: ${:.2} CAD", money(&view.total_gain_loss)));
    if let Some(pct) = &view.total_gain_loss_percent {
        parts.push(format!("- Return: {:.2}%", money(pct)));
    }
    parts.push(format!(
        "- Cash: ${:.2} CAD, ${:.2} USD",
        money(&view.cash_balance_cad),
        money(&view.cash_balance_usd)
    ));
    parts.push(String::new());

    parts.push("## Current Holdings".to_string());
    if view.holdings.is_empty() {
        parts.push("No holdings currently.".to_string());
    } else {
        for holding in &view.holdings {
            parts.push(format!("\n### {} ({})", holding.symbol, holding.currency));
            parts.push(format!("- Quantity: {:.2} shares", money(&holding.quantity)));
            parts.push(format!("- Average Cost: ${:.2}", money(&holding.average_cost)));
            if let Some(price) = &holding.current_price {
                parts.push(format!("- Current Price: ${:.2}", money(price)));
            }
            if let Some(value) = &holding.current_value {
                parts.push(format!("- Current Value: ${:.2}", money(value)));
            }
            if let (Some(gl), Some(pct)) = (
                &holding.unrealized_gain_loss,
                &holding.unrealized_gain_loss_percent,
            ) {
                parts.push(format!("- Unrealized Gain/Loss: ${:.2} ({:.2}%)", money(gl), money(pct)));
            }
        }
    }
    parts.push(String::new());

    parts.push("## Recent Transaction Activity".to_string());
    if transactions.is_empty() {
        parts.push("No recent transactions.".to_string());
    } else {
        for txn in transactions.iter().take(10) {
            parts.push(format!(
                "- {}: {:?} {:.2} shares of {} @ ${:.2}",
                txn.transaction_date.date_naive(),
                txn.transaction_type,
                money(&txn.quantity),
                txn.symbol,
                money(&txn.price),
            ));
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::{BigDecimal, Zero};
    use std::str::FromStr;

    fn empty_view() -> PortfolioView {
        PortfolioView {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            name: "Growth".to_string(),
            description: None,
            cash_balance_cad: BigDecimal::from_str("150.25").unwrap(),
            cash_balance_usd: BigDecimal::zero(),
            questrade_account_id: None,
            last_questrade_sync: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
            holdings: vec![],
            total_value: BigDecimal::from(1000),
            total_cost: BigDecimal::from(800),
            total_gain_loss: BigDecimal::from(200),
            total_gain_loss_percent: Some(BigDecimal::from(25)),
            total_value_with_cash: BigDecimal::from_str("1150.25").unwrap(),
        }
    }

    #[test]
    fn context_includes_totals_and_cash() {
        let context = build_portfolio_context(&empty_view(), &[]);
        assert!(context.contains("Total Value: $1000.00 CAD"));
        assert!(context.contains("Return: 25.00%"));
        assert!(context.contains("$150.25 CAD"));
        assert!(context.contains("No holdings currently."));
        assert!(context.contains("No recent transactions."));
    }

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate_completion(
            &self,
            _system: &str,
            prompt: String,
        ) -> Result<String, LlmError> {
            Ok(prompt)
        }
    }

    #[tokio::test]
    async fn analysis_prompt_carries_portfolio_context() {
        let advisor = AdvisorService::with_provider(Arc::new(EchoProvider));
        let result = advisor.analyze_portfolio(&empty_view(), &[]).await.unwrap();
        assert!(result.contains("## Portfolio Summary"));
        assert!(result.contains("Total Cost: $800.00 CAD"));
    }

    #[tokio::test]
    async fn unconfigured_advisor_returns_message_not_error() {
        let advisor = AdvisorService::new(AdvisorConfig {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 100,
            temperature: 0.7,
        });
        let result = advisor.analyze_portfolio(&empty_view(), &[]).await.unwrap();
        assert!(result.contains("not configured"));
    }
}

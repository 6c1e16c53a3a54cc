use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub messaging: MessagingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub webhook_secret: String,
    /// Default currency for recorded payments. Gateway amounts arrive in
    /// minor units and are read with two decimal places, so this must be a
    /// two-decimal currency (INR, USD, EUR); zero- or three-decimal
    /// currencies such as JPY or KWD would be mis-scaled.
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub api_url: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
}

impl MessagingConfig {
    /// Without credentials messages are only logged.
    pub fn dry_run() -> Self {
        Self {
            api_url: "https://graph.facebook.com/v19.0".to_string(),
            phone_number_id: None,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub organization_name: String,
    pub reminder_interval_secs: u64,
    /// Paid subscriptions with this many days (or fewer) left get a reminder.
    pub reminder_lead_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            gateway: GatewayConfig {
                webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET")?,
                currency: env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            },

            messaging: MessagingConfig {
                api_url: env::var("MESSAGING_API_URL")
                    .unwrap_or_else(|_| MessagingConfig::dry_run().api_url),
                phone_number_id: env::var("MESSAGING_PHONE_NUMBER_ID").ok(),
                access_token: env::var("MESSAGING_ACCESS_TOKEN").ok(),
            },

            app: AppConfig {
                organization_name: env::var("ORGANIZATION_NAME")
                    .unwrap_or_else(|_| AppConfig::default().organization_name),
                reminder_interval_secs: env::var("REMINDER_INTERVAL_SECS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .unwrap_or(86400),
                reminder_lead_days: env::var("REMINDER_LEAD_DAYS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
            },
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            organization_name: "Donation Trust".to_string(),
            reminder_interval_secs: 86400,
            reminder_lead_days: 1,
        }
    }
}

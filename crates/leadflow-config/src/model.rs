// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Leadflow lead engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use leadflow_core::TierThresholds;
use serde::{Deserialize, Serialize};

/// Top-level Leadflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadflowConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Question flow, scoring map, and qualification thresholds.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// A/B test definitions.
    #[serde(default)]
    pub ab_testing: AbTestingConfig,

    /// Qualified-lead notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// CRM export projection settings.
    #[serde(default)]
    pub crm: CrmConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadflow").join("leadflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("leadflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

/// Logging and metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Heap size in MiB above which the daemon logs memory pressure.
    #[serde(default = "default_memory_warn_mb")]
    pub memory_warn_mb: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: default_metrics_enabled(),
            memory_warn_mb: default_memory_warn_mb(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_memory_warn_mb() -> u64 {
    256
}

/// Static definition of the question flow and the scoring rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Points awarded per named event. Unknown events score 0.
    #[serde(default = "default_scoring")]
    pub scoring: BTreeMap<String, i64>,

    /// Qualification tier thresholds.
    #[serde(default)]
    pub thresholds: TierThresholds,

    /// Answer scoring constants.
    #[serde(default)]
    pub answer_scoring: AnswerScoringConfig,

    /// Ordered question list.
    #[serde(default = "default_questions")]
    pub questions: Vec<QuestionConfig>,

    /// Products offered once the profile questions are done.
    #[serde(default = "default_product_menu")]
    pub product_menu: Vec<MenuOption>,

    /// Closing calls to action.
    #[serde(default = "default_cta_options")]
    pub cta_options: Vec<MenuOption>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            scoring: default_scoring(),
            thresholds: TierThresholds::default(),
            answer_scoring: AnswerScoringConfig::default(),
            questions: default_questions(),
            product_menu: default_product_menu(),
            cta_options: default_cta_options(),
        }
    }
}

fn default_scoring() -> BTreeMap<String, i64> {
    [
        ("session_opened", 5),
        ("replied_to_greeting", 5),
        ("answered_question", 5),
        ("answered_all_questions", 10),
        ("shared_contact", 10),
        ("clicked_product", 5),
        ("clicked_pricing", 10),
        ("clicked_demo", 15),
        ("meaningful_reply", 10),
        ("quick_reply", 5),
        ("detailed_answer", 5),
        ("cta_clicked", 15),
        ("early_dropout", -10),
        ("ignored_cta", 0),
        ("completed_journey", 10),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Constants for scoring a single answer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerScoringConfig {
    /// Points for any answer.
    #[serde(default = "default_base_score")]
    pub base_score: i64,

    /// Trimmed answers longer than this earn the `detailed_answer` bonus.
    #[serde(default = "default_detailed_answer_min_chars")]
    pub detailed_answer_min_chars: usize,

    /// Answers faster than this many seconds earn the `quick_reply` bonus.
    #[serde(default = "default_quick_reply_max_secs")]
    pub quick_reply_max_secs: f64,
}

impl Default for AnswerScoringConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            detailed_answer_min_chars: default_detailed_answer_min_chars(),
            quick_reply_max_secs: default_quick_reply_max_secs(),
        }
    }
}

fn default_base_score() -> i64 {
    5
}

fn default_detailed_answer_min_chars() -> usize {
    10
}

fn default_quick_reply_max_secs() -> f64 {
    120.0
}

/// One question in the funnel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionConfig {
    pub id: i64,
    /// Funnel step the question belongs to (greeting, profile, contact).
    pub step: String,
    pub question_text: String,
    pub question_type: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    pub order_index: i64,
}

fn default_required() -> bool {
    true
}

fn default_questions() -> Vec<QuestionConfig> {
    fn question(
        id: i64,
        step: &str,
        text: &str,
        question_type: &str,
        options: &[&str],
        required: bool,
    ) -> QuestionConfig {
        QuestionConfig {
            id,
            step: step.to_string(),
            question_text: text.to_string(),
            question_type: question_type.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            required,
            order_index: id,
        }
    }

    vec![
        question(
            1,
            "greeting",
            "Hi! Welcome to YouShop/YouResto, your smart business partner. \
             Can I ask a few quick questions to customize your solution?",
            "single_choice",
            &["Yes, go ahead", "What is this about?", "No thanks"],
            true,
        ),
        question(
            2,
            "profile",
            "What type of business do you run?",
            "single_choice",
            &["Kirana / Retail Shop", "Restaurant / Café", "Wholesale / FMCG", "Other"],
            true,
        ),
        question(3, "profile", "Where is your shop located?", "text", &[], true),
        question(
            4,
            "profile",
            "How many staff members work with you?",
            "single_choice",
            &["Just me", "2–5", "6–15", "More than 15"],
            true,
        ),
        question(
            5,
            "profile",
            "What's your monthly sales volume? (approx.)",
            "single_choice",
            &["Less than ₹50K", "₹50K – ₹2L", "₹2L – ₹5L", "₹5L+"],
            true,
        ),
        question(
            6,
            "profile",
            "What do you need help with?",
            "multiple_choice",
            &[
                "Billing / Invoicing",
                "QR Payments",
                "Staff/HR",
                "Inventory",
                "Online Store",
                "WhatsApp Marketing",
                "Loans",
            ],
            true,
        ),
        question(
            7,
            "contact",
            "Can we get your contact details to send your custom setup or offers?",
            "contact_form",
            &["Share Phone", "Share Email", "Skip for now"],
            false,
        ),
    ]
}

/// One selectable entry in the product menu or the CTA list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MenuOption {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Points a click on this entry is worth.
    #[serde(default)]
    pub score: i64,
}

fn menu(entries: &[(&str, &str, &str, i64)]) -> Vec<MenuOption> {
    entries
        .iter()
        .map(|(id, title, description, score)| MenuOption {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            score: *score,
        })
        .collect()
}

fn default_product_menu() -> Vec<MenuOption> {
    menu(&[
        ("billing", "📊 Billing & Invoicing", "GST-compliant billing and invoicing", 5),
        ("inventory", "📦 Inventory", "Track and manage your stock", 5),
        ("qr_payments", "💳 QR / Payments", "Accept digital payments easily", 5),
        ("staff_hr", "👥 Staff & HR", "Manage your team efficiently", 5),
        ("online_selling", "🛒 Online Selling", "Sell online and reach more customers", 5),
        ("whatsapp_tools", "💬 WhatsApp Tools", "Business communication tools", 5),
        ("loans_offers", "💰 Loans & Offers", "Financial solutions for your business", 5),
        ("demo", "🎥 Watch Demo", "See our products in action", 15),
        ("other", "❓ Other Questions", "Get help with anything else", 5),
    ])
}

fn default_cta_options() -> Vec<MenuOption> {
    menu(&[
        ("talk_to_sales", "🤝 Talk to Sales Rep", "Connect with our sales team", 15),
        ("request_callback", "📞 Request Callback", "We'll call you back", 15),
        ("start_trial", "🚀 Start Free Trial", "Try our products for free", 15),
        ("restart_bot", "🔄 Restart Bot", "Start the conversation over", 0),
        ("human_help", "❓ Need Human Help", "Connect with our support team", 10),
    ])
}

/// A/B testing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AbTestingConfig {
    /// When disabled every session receives the baseline variant and nothing is logged.
    #[serde(default = "default_ab_enabled")]
    pub enabled: bool,

    /// Variant returned when no variant has enough data to win.
    #[serde(default = "default_baseline_variant")]
    pub baseline_variant: String,

    /// Minimum assignments before a variant may be declared the winner.
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,

    /// Test name to ordered variant ids.
    #[serde(default = "default_ab_tests")]
    pub tests: BTreeMap<String, Vec<String>>,
}

impl Default for AbTestingConfig {
    fn default() -> Self {
        Self {
            enabled: default_ab_enabled(),
            baseline_variant: default_baseline_variant(),
            min_sample_size: default_min_sample_size(),
            tests: default_ab_tests(),
        }
    }
}

fn default_ab_enabled() -> bool {
    true
}

fn default_baseline_variant() -> String {
    "A".to_string()
}

fn default_min_sample_size() -> u64 {
    10
}

fn default_ab_tests() -> BTreeMap<String, Vec<String>> {
    [
        "greeting_message",
        "question_flow",
        "cta_presentation",
        "urgency_messaging",
    ]
    .into_iter()
    .map(|name| {
        (
            name.to_string(),
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
        )
    })
    .collect()
}

/// Qualified-lead notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Emit the qualified-lead signal when a lead enters the SQL tier.
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
        }
    }
}

fn default_notifications_enabled() -> bool {
    true
}

/// CRM export projection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrmConfig {
    /// Team the exported lead is assigned to.
    #[serde(default = "default_assigned_to")]
    pub assigned_to: String,

    /// Lead source used when the session carried no UTM source.
    #[serde(default = "default_utm_source")]
    pub default_utm_source: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            assigned_to: default_assigned_to(),
            default_utm_source: default_utm_source(),
        }
    }
}

fn default_assigned_to() -> String {
    "CTL-Team".to_string()
}

fn default_utm_source() -> String {
    "direct".to_string()
}

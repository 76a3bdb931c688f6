//! Tracking script rendering.
//!
//! Every function here is a pure substitution over a settings snapshot. Values
//! are inserted verbatim: anything that ends up inside a single-quoted JS
//! literal must already be script-safe, see [`OrderContext::script_safe`].

use crate::settings::TrackingSettings;
use crate::template::{Placeholder, apply_substitutions};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const OPT_OUT_SCRIPT: &str = r#"var gaProperty = '{GOOGLEID}';
	var disableStr = 'ga-disable-' + gaProperty;
	if (document.cookie.indexOf(disableStr + '=true') > -1) {
		window[disableStr] = true;
	}
	function gaOptout() {
		document.cookie = disableStr + '=true; expires=Thu, 31 Dec 2099 23:59:59 UTC; path=/';
		window[disableStr] = true;
	}"#;

const STORAGE_NONE_SCRIPT: &str = "ga('set', 'storage', 'none');";

/// One product line reported with a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_name: String,
    pub sku: String,
    #[serde(default)]
    pub category_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Order being reported on the current page. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderContext {
    pub order_id: String,
    pub site: String,
    pub total: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub currency: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl OrderContext {
    /// Copy with free-text fields escaped for single-quoted JS string literals.
    pub fn script_safe(&self) -> Self {
        Self {
            order_id: escape_js_literal(&self.order_id),
            site: escape_js_literal(&self.site),
            currency: escape_js_literal(&self.currency),
            items: self
                .items
                .iter()
                .map(|item| LineItem {
                    product_name: escape_js_literal(&item.product_name),
                    sku: escape_js_literal(&item.sku),
                    category_name: escape_js_literal(&item.category_name),
                    ..item.clone()
                })
                .collect(),
            ..self.clone()
        }
    }
}

/// Escapes `\`, `'` and line breaks. Also breaks up `</` so a value can never
/// close the surrounding script element.
pub fn escape_js_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev = '\0';
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '/' if prev == '<' => out.push_str("\\/"),
            _ => out.push(ch),
        }
        prev = ch;
    }
    out
}

/// Derives the `{SITE}` value from a store URL: host only, no `www.` prefix.
pub fn site_from_store_url(store_url: &str) -> String {
    match url::Url::parse(store_url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| host.trim_start_matches("www.").to_string())
            .unwrap_or_default(),
        Err(_) => store_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("www.")
            .trim_end_matches('/')
            .to_string(),
    }
}

/// Invariant-culture money: always two fractional digits, `.` separator.
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Whether the analytics library may persist its client id cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    #[default]
    Default,
    Disabled,
}

impl StorageType {
    pub fn from_consent(analytics_allowed: bool) -> Self {
        if analytics_allowed {
            StorageType::Default
        } else {
            StorageType::Disabled
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            StorageType::Default => "",
            StorageType::Disabled => STORAGE_NONE_SCRIPT,
        }
    }
}

/// Snippet wiring the `ga-disable-<id>` opt-out cookie.
pub fn opt_out_snippet(google_id: &str) -> String {
    apply_substitutions(OPT_OUT_SCRIPT, &[(Placeholder::GoogleId, google_id)])
}

/// Per-request values for the page view template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewInput {
    #[serde(default)]
    pub opt_out_snippet: String,
    #[serde(default)]
    pub storage_type: StorageType,
    #[serde(default)]
    pub ecommerce: String,
}

pub struct TrackingScriptRenderer;

impl TrackingScriptRenderer {
    pub fn render_page_view(settings: &TrackingSettings, input: &PageViewInput) -> String {
        apply_substitutions(
            &settings.tracking_script,
            &[
                (Placeholder::OptOutCookie, &input.opt_out_snippet),
                (Placeholder::GoogleId, &settings.google_id),
                (Placeholder::StorageType, input.storage_type.directive()),
                (Placeholder::Ecommerce, &input.ecommerce),
            ],
        )
    }

    /// `details` is the already concatenated output of
    /// [`Self::render_ecommerce_detail`] for every line item.
    pub fn render_ecommerce(
        settings: &TrackingSettings,
        order: &OrderContext,
        details: &str,
    ) -> String {
        let total = format_money(order.total);
        let shipping = format_money(order.shipping);
        let tax = format_money(order.tax);
        apply_substitutions(
            &settings.ecommerce_script,
            &[
                (Placeholder::OrderId, &order.order_id),
                (Placeholder::Site, &order.site),
                (Placeholder::Total, &total),
                (Placeholder::Ship, &shipping),
                (Placeholder::Tax, &tax),
                (Placeholder::Currency, &order.currency),
                (Placeholder::Details, details),
            ],
        )
    }

    pub fn render_ecommerce_detail(
        settings: &TrackingSettings,
        order_id: &str,
        item: &LineItem,
    ) -> String {
        let price = format_money(item.unit_price);
        let quantity = item.quantity.to_string();
        apply_substitutions(
            &settings.ecommerce_detail_script,
            &[
                (Placeholder::OrderId, order_id),
                (Placeholder::ProductName, &item.product_name),
                (Placeholder::ProductSku, &item.sku),
                (Placeholder::CategoryName, &item.category_name),
                (Placeholder::UnitPrice, &price),
                (Placeholder::Quantity, &quantity),
            ],
        )
    }

    /// Detail scripts in line-item order, joined without separator, wrapped in
    /// the transaction template.
    pub fn render_order(settings: &TrackingSettings, order: &OrderContext) -> String {
        let details: String = order
            .items
            .iter()
            .map(|item| Self::render_ecommerce_detail(settings, &order.order_id, item))
            .collect();
        Self::render_ecommerce(settings, order, &details)
    }

    pub fn render_tracking(
        settings: &TrackingSettings,
        input: &PageViewInput,
        order: Option<&OrderContext>,
    ) -> String {
        match order {
            Some(order) => {
                let input = PageViewInput {
                    ecommerce: Self::render_order(settings, order),
                    ..input.clone()
                };
                Self::render_page_view(settings, &input)
            }
            None => Self::render_page_view(settings, input),
        }
    }
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Tokens recognised inside the stored tracking templates.
///
/// Admins edit templates by hand, so the token spelling is a stable public
/// format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    OptOutCookie,
    GoogleId,
    StorageType,
    Ecommerce,
    OrderId,
    Site,
    Total,
    Ship,
    Tax,
    Currency,
    Details,
    ProductName,
    ProductSku,
    CategoryName,
    UnitPrice,
    Quantity,
}

impl Placeholder {
    pub const fn token(self) -> &'static str {
        match self {
            Placeholder::OptOutCookie => "{OPTOUTCOOKIE}",
            Placeholder::GoogleId => "{GOOGLEID}",
            Placeholder::StorageType => "{STORAGETYPE}",
            Placeholder::Ecommerce => "{ECOMMERCE}",
            Placeholder::OrderId => "{ORDERID}",
            Placeholder::Site => "{SITE}",
            Placeholder::Total => "{TOTAL}",
            Placeholder::Ship => "{SHIP}",
            Placeholder::Tax => "{TAX}",
            Placeholder::Currency => "{CURRENCY}",
            Placeholder::Details => "{DETAILS}",
            Placeholder::ProductName => "{PRODUCTNAME}",
            Placeholder::ProductSku => "{PRODUCTSKU}",
            Placeholder::CategoryName => "{CATEGORYNAME}",
            Placeholder::UnitPrice => "{UNITPRICE}",
            Placeholder::Quantity => "{QUANTITY}",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The three templates kept in [`crate::settings::TrackingSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Tracking,
    Ecommerce,
    EcommerceDetail,
}

impl TemplateKind {
    /// Closed placeholder set for this template.
    pub const fn placeholders(self) -> &'static [Placeholder] {
        match self {
            TemplateKind::Tracking => &[
                Placeholder::OptOutCookie,
                Placeholder::GoogleId,
                Placeholder::StorageType,
                Placeholder::Ecommerce,
            ],
            TemplateKind::Ecommerce => &[
                Placeholder::OrderId,
                Placeholder::Site,
                Placeholder::Total,
                Placeholder::Ship,
                Placeholder::Tax,
                Placeholder::Currency,
                Placeholder::Details,
            ],
            TemplateKind::EcommerceDetail => &[
                Placeholder::OrderId,
                Placeholder::ProductName,
                Placeholder::ProductSku,
                Placeholder::CategoryName,
                Placeholder::UnitPrice,
                Placeholder::Quantity,
            ],
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateKind::Tracking => "tracking",
            TemplateKind::Ecommerce => "ecommerce",
            TemplateKind::EcommerceDetail => "ecommerce detail",
        };
        f.write_str(name)
    }
}

/// Replaces every occurrence of each token with its value.
///
/// Tokens absent from the template are skipped and all other text is left
/// untouched. Values are inserted verbatim; a value that happens to contain a
/// token is never expanded a second time.
pub fn apply_substitutions(template: &str, values: &[(Placeholder, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        match values
            .iter()
            .find(|(placeholder, _)| candidate.starts_with(placeholder.token()))
        {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &candidate[placeholder.token().len()..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[A-Z]+\}").expect("static token pattern"))
}

/// Problems spotted in an admin-edited template. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateWarning {
    MissingPlaceholder { template: TemplateKind, token: String },
    UnknownToken { template: TemplateKind, token: String },
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateWarning::MissingPlaceholder { template, token } => {
                write!(f, "{template} template does not contain {token}")
            }
            TemplateWarning::UnknownToken { template, token } => {
                write!(f, "{template} template contains unknown token {token}")
            }
        }
    }
}

pub fn inspect_template(kind: TemplateKind, template: &str) -> Vec<TemplateWarning> {
    let known = kind.placeholders();
    let mut warnings: Vec<TemplateWarning> = known
        .iter()
        .filter(|p| !template.contains(p.token()))
        .map(|p| TemplateWarning::MissingPlaceholder {
            template: kind,
            token: p.token().to_string(),
        })
        .collect();

    let mut seen = Vec::new();
    for m in token_regex().find_iter(template) {
        let token = m.as_str();
        if known.iter().any(|p| p.token() == token) || seen.contains(&token) {
            continue;
        }
        seen.push(token);
        warnings.push(TemplateWarning::UnknownToken {
            template: kind,
            token: token.to_string(),
        });
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_all_known_tokens_and_keeps_other_text() {
        let template = "a {GOOGLEID} b {ECOMMERCE} c {GOOGLEID} {literal}";
        let out = apply_substitutions(
            template,
            &[
                (Placeholder::GoogleId, "UA-1-1"),
                (Placeholder::Ecommerce, ""),
            ],
        );
        assert_eq!(out, "a UA-1-1 b  c UA-1-1 {literal}");
    }

    #[test]
    fn absent_tokens_are_ignored() {
        let out = apply_substitutions("ga('send');", &[(Placeholder::OptOutCookie, "x")]);
        assert_eq!(out, "ga('send');");
    }

    #[test]
    fn values_are_not_expanded_again() {
        let out = apply_substitutions(
            "{PRODUCTNAME}/{PRODUCTSKU}",
            &[
                (Placeholder::ProductName, "{PRODUCTSKU}"),
                (Placeholder::ProductSku, "sku-1"),
            ],
        );
        assert_eq!(out, "{PRODUCTSKU}/sku-1");
    }

    #[test]
    fn js_braces_pass_through() {
        let template = "ga('ecommerce:addItem', {\n 'id': '{ORDERID}'\n});";
        let out = apply_substitutions(template, &[(Placeholder::OrderId, "42")]);
        assert_eq!(out, "ga('ecommerce:addItem', {\n 'id': '42'\n});");
    }

    #[test]
    fn rendered_output_has_no_residual_tokens() {
        for kind in [
            TemplateKind::Tracking,
            TemplateKind::Ecommerce,
            TemplateKind::EcommerceDetail,
        ] {
            let template: String = kind
                .placeholders()
                .iter()
                .map(|p| format!("[{}]", p.token()))
                .collect();
            let values: Vec<(Placeholder, String)> = kind
                .placeholders()
                .iter()
                .enumerate()
                .map(|(i, p)| (*p, format!("v{i}")))
                .collect();
            let borrowed: Vec<(Placeholder, &str)> =
                values.iter().map(|(p, v)| (*p, v.as_str())).collect();
            let out = apply_substitutions(&template, &borrowed);
            for (p, v) in &values {
                assert!(!out.contains(p.token()), "{kind}: {p} left in output");
                assert!(out.contains(v.as_str()));
            }
        }
    }

    #[test]
    fn inspect_reports_missing_and_unknown_tokens() {
        let warnings = inspect_template(
            TemplateKind::Tracking,
            "{GOOGLEID} {ECOMMERCE} {STORAGETYPE} {FOO} {FOO}",
        );
        assert_eq!(
            warnings,
            vec![
                TemplateWarning::MissingPlaceholder {
                    template: TemplateKind::Tracking,
                    token: "{OPTOUTCOOKIE}".into(),
                },
                TemplateWarning::UnknownToken {
                    template: TemplateKind::Tracking,
                    token: "{FOO}".into(),
                },
            ]
        );
    }
}

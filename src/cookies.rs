use crate::localization::ResourceCatalog;
use serde::{Deserialize, Serialize};

pub const COOKIE_NAME_RESOURCE: &str = "Plugins.FriendlyName.SmartStore.GoogleAnalytics";
pub const COOKIE_DESCRIPTION_RESOURCE: &str = "Plugins.Widgets.GoogleAnalytics.CookieInfo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookieCategory {
    Required,
    Analytics,
    ThirdParty,
}

/// Entry shown in the storefront cookie-consent dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieDisclosure {
    pub name: String,
    pub description: String,
    pub category: CookieCategory,
}

/// `None` tells the consent dialog to leave this widget out.
pub async fn resolve_cookie_disclosure(
    widget_active: bool,
    catalog: &dyn ResourceCatalog,
) -> Option<CookieDisclosure> {
    if !widget_active {
        return None;
    }
    Some(CookieDisclosure {
        name: catalog.get_resource(COOKIE_NAME_RESOURCE).await,
        description: catalog.get_resource(COOKIE_DESCRIPTION_RESOURCE).await,
        category: CookieCategory::Analytics,
    })
}

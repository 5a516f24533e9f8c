use crate::crawlers::webdriver::BrowserSession;
use crate::parsers;
use crate::results::JobDetails;
use crate::utils::sanitize_filename;
use fantoccini::Locator;
use std::path::{Path, PathBuf};
use std::time::Duration;

const PAGE_TIMEOUT: Duration = Duration::from_secs(12);

const COOKIE_BUTTONS_CSS: [&str; 5] = [
    "#onetrust-accept-btn-handler",
    "button[aria-label='Accepter tout']",
    "button[aria-label='Tout accepter']",
    "button[aria-label='Accept all']",
    "button[aria-label='Alle akzeptieren']",
];

const COOKIE_BUTTONS_XPATH: [&str; 3] = [
    "//button[contains(., 'Accepter')]",
    "//button[contains(., 'Accept all')]",
    "//button[contains(., 'Alle akzeptieren')]",
];

const CONTACT_TOGGLES: [Locator<'static>; 2] = [
    Locator::Css("[data-cy='vacancy-contact-toggle']"),
    Locator::XPath(
        "//button[contains(., 'Contact') or contains(., 'Kontakt') or contains(., 'Contactez')]",
    ),
];

const PHONE_TOGGLES: [Locator<'static>; 4] = [
    Locator::XPath("//button[contains(., 'Voir le numéro')]"),
    Locator::XPath("//button[contains(., 'Afficher le numéro')]"),
    Locator::XPath("//button[contains(., 'Show phone')]"),
    Locator::XPath("//a[contains(@href,'tel:') and string-length(normalize-space())=0]"),
];

/// Open an offer page and read company, contact and phone from it.
///
/// Navigation failures give empty details; the offer row is still kept.
/// When nothing at all was found a screenshot goes to `debug_dir`.
pub async fn visit_offer(session: &BrowserSession, url: &str, debug_dir: &Path) -> JobDetails {
    if let Err(e) = session.open(url, "body", PAGE_TIMEOUT).await {
        ::log::warn!("Failed to open offer page {}: {}", url, e);
        return JobDetails::default();
    }

    accept_cookies(session).await;
    session.scroll_by(400).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    reveal(session, &CONTACT_TOGGLES, "contact").await;
    reveal(session, &PHONE_TOGGLES, "phone").await;

    let details = match session.source().await {
        Ok(html) => parsers::jobup::extract_details(&html),
        Err(e) => {
            ::log::warn!("Failed to read page source for {}: {}", url, e);
            JobDetails::default()
        }
    };

    if details.is_empty() {
        save_screenshot(session, url, debug_dir).await;
    }
    details
}

/// Dismiss the consent banner if one of the known buttons shows up
async fn accept_cookies(session: &BrowserSession) {
    let css = COOKIE_BUTTONS_CSS.into_iter().map(Locator::Css);
    let xpath = COOKIE_BUTTONS_XPATH.into_iter().map(Locator::XPath);

    for locator in css.chain(xpath) {
        if session.click_first(locator).await {
            ::log::debug!("Cookie banner accepted");
            tokio::time::sleep(Duration::from_millis(300)).await;
            return;
        }
    }
}

async fn reveal(session: &BrowserSession, toggles: &[Locator<'static>], what: &str) {
    for toggle in toggles {
        if session.click_first(toggle.clone()).await {
            ::log::debug!("Revealed {} block", what);
            tokio::time::sleep(Duration::from_millis(500)).await;
            return;
        }
    }
}

/// Where the screenshot of an empty offer page goes
pub fn screenshot_path(debug_dir: &Path, url: &str) -> PathBuf {
    debug_dir.join(format!("debug_{}.png", sanitize_filename(url)))
}

async fn save_screenshot(session: &BrowserSession, url: &str, debug_dir: &Path) {
    let path = screenshot_path(debug_dir, url);
    let png = match session.screenshot().await {
        Ok(png) => png,
        Err(e) => {
            ::log::debug!("Screenshot failed for {}: {}", url, e);
            return;
        }
    };
    let written = async {
        tokio::fs::create_dir_all(debug_dir).await?;
        tokio::fs::write(&path, png).await
    };
    match written.await {
        Ok(()) => ::log::info!("Nothing found on {}, screenshot saved to {}", url, path.display()),
        Err(e) => ::log::warn!("Failed to save screenshot {}: {}", path.display(), e),
    }
}

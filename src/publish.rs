//! Marketplace publishing through a real browser.
//!
//! [`VintedPublisher`] drives Chrome over the DevTools protocol
//! (`headless_chrome`):
//!
//! ```text
//! home ──accept cookies (if shown)──► login form ──► /items/new
//!      ──attach photos──► title, description, category, price ──► Publicar
//!      ──► listing URL  (or NotPublished if still on /items/new)
//! ```
//!
//! Every wait is bounded by `publish.timeout_secs`. Optional steps (cookie
//! banner, category picker) are skipped when their element is absent.

use crate::config::{Credentials, PublishConfig};
use crate::select::{Order, list_images};
use crate::types::BookMetadata;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Browser error while {step}: {message}")]
    Browser { step: &'static str, message: String },
    #[error("Missing credential: {0}")]
    MissingCredentials(&'static str),
    #[error("Listing was not published (browser still at {0})")]
    NotPublished(String),
    #[error("No photos to attach in {}", .0.display())]
    NoPhotos(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Publishes one book and returns the listing URL.
pub trait ListingPublisher {
    fn publish(&self, folder: &Path, metadata: &BookMetadata) -> Result<String, PublishError>;
}

/// Page elements the flow relies on.
mod selectors {
    pub const COOKIE_ACCEPT: &str = r#"button[data-testid="onetrust-accept-btn-handler"]"#;
    pub const LOGIN_BUTTON: &str = r#"a[data-testid="header--login-button"]"#;
    pub const EMAIL: &str = r#"input[name="email"]"#;
    pub const PASSWORD: &str = r#"input[name="password"]"#;
    pub const SUBMIT: &str = r#"button[type="submit"]"#;
    pub const FILE_INPUT: &str = r#"input[type="file"]"#;
    pub const TITLE: &str = r#"[name="title"]"#;
    pub const DESCRIPTION: &str = r#"[name="description"]"#;
    pub const PRICE: &str = r#"input[name="price"]"#;
    pub const CATEGORY_BUTTON: &str = "//button[contains(., 'Escolher categoria')]";
    pub const BOOKS_CATEGORY: &str = "//span[contains(., 'Livros')]";
    pub const PUBLISH_BUTTON: &str = "//button[contains(., 'Publicar')]";
}

/// Path of the new-listing form.
pub const NEW_ITEM_PATH: &str = "/items/new";

/// Wait for optional elements, shorter than the default timeout.
const OPTIONAL_WAIT: Duration = Duration::from_secs(3);

/// Price as typed into the form: whole euros, fraction dropped.
pub fn price_text(price: f64) -> String {
    (price.trunc() as i64).to_string()
}

/// Whether `url` is still the new-listing form.
pub fn is_new_item_form(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').ends_with(NEW_ITEM_PATH)
}

fn browser_err<E: Display>(step: &'static str) -> impl FnOnce(E) -> PublishError {
    move |e| PublishError::Browser {
        step,
        message: e.to_string(),
    }
}

pub struct VintedPublisher {
    base_url: String,
    email: String,
    password: String,
    headless: bool,
    timeout: Duration,
}

impl VintedPublisher {
    pub fn new(
        config: &PublishConfig,
        credentials: &Credentials,
        headless: bool,
    ) -> Result<Self, PublishError> {
        let email = credentials
            .vinted_email
            .clone()
            .ok_or(PublishError::MissingCredentials("VINTED_EMAIL"))?;
        let password = credentials
            .vinted_password
            .clone()
            .ok_or(PublishError::MissingCredentials("VINTED_PASSWORD"))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email,
            password,
            headless,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn launch(&self) -> Result<Browser, PublishError> {
        Browser::new(LaunchOptions {
            headless: self.headless,
            sandbox: false,
            window_size: Some((1280, 800)),
            idle_browser_timeout: self.timeout * 4,
            ..Default::default()
        })
        .map_err(browser_err("launching Chrome"))
    }

    fn log_in(&self, tab: &Tab) -> Result<(), PublishError> {
        tab.navigate_to(&self.base_url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(browser_err("opening the home page"))?;

        if let Ok(accept) =
            tab.wait_for_element_with_custom_timeout(selectors::COOKIE_ACCEPT, OPTIONAL_WAIT)
        {
            accept.click().map_err(browser_err("accepting cookies"))?;
            debug!("cookie banner accepted");
        }

        tab.wait_for_element(selectors::LOGIN_BUTTON)
            .and_then(|e| e.click().map(|_| ()))
            .map_err(browser_err("opening the login form"))?;
        tab.wait_for_element(selectors::EMAIL)
            .and_then(|e| e.type_into(&self.email).map(|_| ()))
            .map_err(browser_err("typing the email"))?;
        tab.wait_for_element(selectors::PASSWORD)
            .and_then(|e| e.type_into(&self.password).map(|_| ()))
            .map_err(browser_err("typing the password"))?;
        tab.wait_for_element(selectors::SUBMIT)
            .and_then(|e| e.click().map(|_| ()))
            .map_err(browser_err("submitting the login form"))?;
        tab.wait_until_navigated()
            .map_err(browser_err("logging in"))?;
        info!("logged in");
        Ok(())
    }

    fn fill_listing(
        &self,
        tab: &Tab,
        photos: &[PathBuf],
        metadata: &BookMetadata,
    ) -> Result<(), PublishError> {
        let form_url = format!("{}{}", self.base_url, NEW_ITEM_PATH);
        tab.navigate_to(&form_url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(browser_err("opening the new listing form"))?;

        for photo in photos {
            let path = photo.to_string_lossy();
            tab.wait_for_element(selectors::FILE_INPUT)
                .and_then(|input| input.set_input_files(&[&*path]).map(|_| ()))
                .map_err(browser_err("attaching a photo"))?;
            debug!(photo = %photo.display(), "photo attached");
        }

        tab.wait_for_element(selectors::TITLE)
            .and_then(|e| e.type_into(&metadata.title).map(|_| ()))
            .map_err(browser_err("typing the title"))?;
        tab.wait_for_element(selectors::DESCRIPTION)
            .and_then(|e| e.type_into(&metadata.description).map(|_| ()))
            .map_err(browser_err("typing the description"))?;

        if let Ok(picker) =
            tab.wait_for_xpath_with_custom_timeout(selectors::CATEGORY_BUTTON, OPTIONAL_WAIT)
        {
            picker.click().map_err(browser_err("opening the category picker"))?;
            if let Ok(books) =
                tab.wait_for_xpath_with_custom_timeout(selectors::BOOKS_CATEGORY, OPTIONAL_WAIT)
            {
                books.click().map_err(browser_err("choosing the books category"))?;
            }
        }

        let price = tab
            .wait_for_element(selectors::PRICE)
            .map_err(browser_err("finding the price field"))?;
        price
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .map_err(browser_err("clearing the price"))?;
        price
            .type_into(&price_text(metadata.price))
            .map_err(browser_err("typing the price"))?;
        Ok(())
    }

    /// Click publish, then wait for the browser to leave the form.
    fn submit(&self, tab: &Tab) -> Result<String, PublishError> {
        tab.wait_for_xpath(selectors::PUBLISH_BUTTON)
            .and_then(|e| e.click().map(|_| ()))
            .map_err(browser_err("clicking publish"))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let url = tab.get_url();
            if !is_new_item_form(&url) {
                return Ok(url);
            }
            if Instant::now() >= deadline {
                return Err(PublishError::NotPublished(url));
            }
            thread::sleep(Duration::from_millis(250));
        }
    }
}

impl ListingPublisher for VintedPublisher {
    fn publish(&self, folder: &Path, metadata: &BookMetadata) -> Result<String, PublishError> {
        let photos: Vec<PathBuf> = list_images(folder, Order::Lexical)?
            .into_iter()
            .map(|p| p.canonicalize())
            .collect::<Result<_, _>>()?;
        if photos.is_empty() {
            return Err(PublishError::NoPhotos(folder.to_path_buf()));
        }

        let browser = self.launch()?;
        let tab = browser.new_tab().map_err(browser_err("opening a tab"))?;
        tab.set_default_timeout(self.timeout);

        self.log_in(&tab)?;
        self.fill_listing(&tab, &photos, metadata)?;
        let url = self.submit(&tab)?;
        info!(%url, title = %metadata.title, "listing published");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials {
            vinted_email: Some("seller@example.com".into()),
            vinted_password: Some("hunter2".into()),
            ..Default::default()
        }
    }

    fn metadata() -> BookMetadata {
        BookMetadata {
            title: "Book 001".into(),
            author: None,
            isbn: None,
            genre: None,
            price: 7.0,
            description: "x".into(),
        }
    }

    #[test]
    fn price_is_typed_in_whole_euros() {
        assert_eq!(price_text(7.0), "7");
        assert_eq!(price_text(7.99), "7");
        assert_eq!(price_text(12.5), "12");
    }

    #[test]
    fn new_item_form_detection() {
        assert!(is_new_item_form("https://www.vinted.pt/items/new"));
        assert!(is_new_item_form("https://www.vinted.pt/items/new/?ref=nav"));
        assert!(!is_new_item_form("https://www.vinted.pt/items/5123-mensagem"));
        assert!(!is_new_item_form("https://www.vinted.pt/"));
    }

    #[test]
    fn missing_credentials_rejected() {
        let mut creds = credentials();
        creds.vinted_password = None;
        let err = VintedPublisher::new(&PublishConfig::default(), &creds, true)
            .err()
            .unwrap();
        assert!(matches!(err, PublishError::MissingCredentials("VINTED_PASSWORD")));

        let err = VintedPublisher::new(&PublishConfig::default(), &Credentials::default(), true)
            .err()
            .unwrap();
        assert!(matches!(err, PublishError::MissingCredentials("VINTED_EMAIL")));
    }

    #[test]
    fn empty_folder_fails_before_launching_browser() {
        let tmp = TempDir::new().unwrap();
        let publisher = VintedPublisher::new(&PublishConfig::default(), &credentials(), true).unwrap();
        let err = publisher.publish(tmp.path(), &metadata()).unwrap_err();
        assert!(matches!(err, PublishError::NoPhotos(_)));
    }
}

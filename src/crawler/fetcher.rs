use anyhow::{bail, Context};
use reqwest::{Client, Response, Url};
use tracing::{info, warn};

const USER_AGENT: &str = "moviepilot-export/0.1";
const LOGIN_PATH: &str = "/login?next=";
const SESSION_PATH: &str = "/api/session";

/// Login pair handed to [`Session::login`]. Already resolved; nothing here prompts.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cookie-carrying HTTP session against one site root.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    base: Url,
}

impl Session {
    pub fn open(base_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base_url.trim())
            .with_context(|| format!("invalid base url {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("base url {base_url} cannot carry a path");
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("failed to build http client")?;

        Ok(Self { client, base })
    }

    fn root(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Absolute URLs pass through; site-relative paths are joined onto the base.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.root(), path)
        } else {
            format!("{}/{}", self.root(), path)
        }
    }

    /// `{base}/users/{user}/rated/movies?page={page}` with `user` percent-encoded
    /// as a single path segment.
    pub fn listing_url(&self, user: &str, page: u32) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["users", user, "rated", "movies"]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("page", &page.to_string());
        url.into()
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        self.client.get(url).send().await
    }

    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> reqwest::Result<Response> {
        self.client.post(url).form(form).send().await
    }

    /// Primes the session cookies from the login page, then posts the credentials.
    pub async fn login(&self, credentials: &Credentials) -> anyhow::Result<()> {
        let login_url = self.absolute_url(LOGIN_PATH);
        self.get(&login_url)
            .await
            .with_context(|| format!("failed to load login page {login_url}"))?;

        let session_url = self.absolute_url(SESSION_PATH);
        let res = self
            .post_form(
                &session_url,
                &[
                    ("username", credentials.username.as_str()),
                    ("password", credentials.password.as_str()),
                ],
            )
            .await
            .with_context(|| format!("failed to post login to {session_url}"))?;

        if res.status().is_success() {
            info!(username = %credentials.username, "Logged in");
        } else {
            warn!(
                status = %res.status(),
                "Login was not accepted; continuing with an anonymous session"
            );
        }

        Ok(())
    }

    /// Listing page markup, or `None` when the page cannot be fetched at all.
    pub async fn fetch_listing(&self, url: &str) -> Option<String> {
        let res = match self.get(url).await {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, error = %e, "Listing request failed");
                return None;
            }
        };

        if !res.status().is_success() {
            info!(%url, status = %res.status(), "Listing page not available");
            return None;
        }

        match res.text().await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!(%url, error = %e, "Failed to read listing body");
                None
            }
        }
    }

    pub async fn fetch_html(&self, url: &str) -> anyhow::Result<String> {
        let res = self.get(url).await?.error_for_status()?;
        Ok(res.text().await?)
    }
}

use std::env;

use crate::client::WikiWriteApi;
use crate::error::SetupError;

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

impl Credentials {
    /// Reads WIKI_BOT_USER / WIKI_BOT_PASS. Both must be set and non-blank.
    pub fn from_env() -> Result<Option<Self>, SetupError> {
        let username = env::var("WIKI_BOT_USER").ok().filter(|v| !v.trim().is_empty());
        let password = env::var("WIKI_BOT_PASS").ok().filter(|v| !v.trim().is_empty());
        match (username, password) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => Ok(Some(Self {
                username: username.trim().to_string(),
                password: password.trim().to_string(),
            })),
            (Some(_), None) => Err(SetupError::MissingCredentials("WIKI_BOT_PASS")),
            (None, Some(_)) => Err(SetupError::MissingCredentials("WIKI_BOT_USER")),
        }
    }
}

/// A wiki client for the lifetime of one run.
///
/// Created with [`WikiSession::open`] before any page is touched, borrowed
/// mutably by the driver for every read and write, and consumed by
/// [`WikiSession::close`] when the run ends.
pub struct WikiSession<A> {
    api: A,
    username: Option<String>,
}

impl<A: WikiWriteApi> WikiSession<A> {
    /// Logs in when credentials are given; a rejected login is fatal.
    pub fn open(mut api: A, credentials: Option<&Credentials>) -> Result<Self, SetupError> {
        let username = match credentials {
            Some(credentials) => {
                api.login(&credentials.username, &credentials.password)
                    .map_err(|error| SetupError::Login(format!("{error:#}")))?;
                tracing::info!(user = %credentials.username, "logged in");
                Some(credentials.username.clone())
            }
            None => {
                tracing::info!("no credentials configured; continuing anonymously");
                None
            }
        };
        Ok(Self { api, username })
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn api(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn request_count(&self) -> usize {
        self.api.request_count()
    }

    /// Ends the session and hands the client back.
    pub fn close(self) -> A {
        tracing::debug!(requests = self.api.request_count(), "session closed");
        self.api
    }
}

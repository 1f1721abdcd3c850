//! HTTP implementation of `Controller` on top of blocking `reqwest`.
//!
//! Every request carries a freshly signed OAuth header. Status signals are
//! multipart POSTs with `op=signal`; captured output travels as file parts.

use crate::error::{ConfigError, ReportingError, TransferError};
use crate::script_traits::Controller;
use crate::signing::Credentials;
use crate::status::StatusSignal;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

pub struct HttpController {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpController {
    /// `base_url` is the node's metadata endpoint; signals are posted to it
    /// and relative fetch URLs resolve against it.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ConfigError::new(format!("invalid controller url {:?}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::new(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, TransferError> {
        self.base_url.join(url).map_err(|e| TransferError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn signal_form(signal: &StatusSignal) -> Form {
        let mut form = Form::new()
            .text("op", "signal")
            .text("status", signal.status.to_string());

        if let Some(ref error) = signal.error {
            form = form.text("error", error.clone());
        }
        if let Some(exit_status) = signal.exit_status {
            form = form.text("exit_status", exit_status.to_string());
        }
        if let Some(id) = signal.script_result_id {
            form = form.text("script_result_id", id.to_string());
        }
        if let Some(id) = signal.script_version_id {
            form = form.text("script_version_id", id.to_string());
        }
        for (name, content) in &signal.files {
            let part = Part::bytes(content.clone()).file_name(name.clone());
            form = form.part(name.clone(), part);
        }
        form
    }
}

impl Controller for HttpController {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let url = self.resolve(url)?;
        debug!(%url, "fetching");

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.credentials.sign_now())
            .send()
            .map_err(|e| TransferError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|body| body.to_vec())
            .map_err(|e| TransferError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn signal(&self, signal: &StatusSignal) -> Result<(), ReportingError> {
        let status = signal.status.to_string();
        debug!(
            %status,
            error = signal.error.as_deref().unwrap_or(""),
            files = signal.files.len(),
            "sending signal"
        );

        let response = self
            .client
            .post(self.base_url.clone())
            .header(AUTHORIZATION, self.credentials.sign_now())
            .multipart(Self::signal_form(signal))
            .send()
            .map_err(|e| ReportingError::Request {
                status: status.clone(),
                reason: e.to_string(),
            })?;

        let code = response.status();
        if !code.is_success() {
            return Err(ReportingError::Rejected {
                status,
                code: code.as_u16(),
            });
        }
        Ok(())
    }
}

//! External process fetcher
//!
//! Shells out to a curl-compatible HTTP client. The response body is read
//! from standard output; curl's `--write-out` appends a trailer line carrying
//! the status code, content type and effective URL after redirects.

use crate::auth::AuthContext;
use crate::fetch::{request_headers, Document, FetchStrategy};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Prefix of the trailer line written by `--write-out`
const TRAILER_MARKER: &str = "__PAGE_HARVEST__:";

/// Slack on top of `--max-time` before the child is killed from our side
const KILL_GRACE: Duration = Duration::from_secs(2);

/// curl exit code for "failed to connect to host"
const CURL_COULDNT_CONNECT: i32 = 7;

/// curl exit code for "operation timed out"
const CURL_OPERATION_TIMEDOUT: i32 = 28;

/// Fetches pages by running an HTTP client program
#[derive(Debug, Clone)]
pub struct ExternalProcess {
    pub program: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: u32,
}

/// Status line data recovered from a process's standard output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub body: String,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub effective_url: Option<String>,
}

impl ExternalProcess {
    /// Command-line arguments for fetching `url`
    fn build_args(&self, url: &Url, auth: &AuthContext) -> Vec<String> {
        let mut args = vec![
            "--silent".to_string(),
            "--show-error".to_string(),
            "--location".to_string(),
            "--max-redirs".to_string(),
            self.max_redirects.to_string(),
            "--max-time".to_string(),
            format!("{:.3}", self.timeout.as_secs_f64()),
            "--compressed".to_string(),
            "--user-agent".to_string(),
            self.user_agent.clone(),
        ];

        for (name, value) in request_headers(auth) {
            args.push("--header".to_string());
            args.push(format!("{}: {}", name, value));
        }

        args.push("--write-out".to_string());
        args.push(format!(
            "\\n{}%{{http_code}}|%{{content_type}}|%{{url_effective}}",
            TRAILER_MARKER
        ));
        args.push(url.to_string());
        args
    }

    async fn run(&self, url: &Url, auth: &AuthContext) -> Result<Document, FetchError> {
        let mut command = TokioCommand::new(&self.program);
        command
            .args(self.build_args(url, auth))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout + KILL_GRACE, command.output()).await
        {
            Ok(result) => result.map_err(|e| {
                FetchError::Other(format!("failed to execute {}: {}", self.program, e))
            })?,
            Err(_) => return Err(FetchError::Timeout),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(match output.status.code() {
                Some(CURL_COULDNT_CONNECT) => FetchError::ConnectionRefused,
                Some(CURL_OPERATION_TIMEDOUT) => FetchError::Timeout,
                code => FetchError::Other(format!(
                    "{} exited with {}: {}",
                    self.program,
                    code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    stderr.trim()
                )),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_process_output(&stdout)?;

        let mut headers = BTreeMap::new();
        if let Some(content_type) = parsed.content_type.filter(|ct| !ct.is_empty()) {
            headers.insert("content-type".to_string(), content_type);
        }

        let final_url = parsed
            .effective_url
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        Ok(Document {
            body: parsed.body,
            status_code: parsed.status_code.unwrap_or(200),
            headers,
            final_url,
        })
    }
}

#[async_trait]
impl FetchStrategy for ExternalProcess {
    fn name(&self) -> &'static str {
        "external-process"
    }

    async fn fetch(
        &self,
        url: &Url,
        auth: &AuthContext,
        cancel: &CancellationToken,
    ) -> Result<Document, FetchError> {
        // Dropping the run future drops the child, which kills it
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.run(url, auth) => result,
        }
    }
}

/// Splits process output into body and trailer fields
///
/// Output without a trailer is taken as a plain body. A trailer status
/// outside 2xx is reported as `HttpError`; a blank body is `Other`.
pub fn parse_process_output(stdout: &str) -> Result<ProcessOutput, FetchError> {
    let (body, trailer) = match stdout.rsplit_once(TRAILER_MARKER) {
        Some((body, trailer)) => (body.strip_suffix('\n').unwrap_or(body), Some(trailer)),
        None => (stdout, None),
    };

    let mut parsed = ProcessOutput {
        body: body.to_string(),
        status_code: None,
        content_type: None,
        effective_url: None,
    };

    if let Some(trailer) = trailer {
        let mut fields = trailer.trim_end().splitn(3, '|');
        parsed.status_code = fields
            .next()
            .and_then(|code| code.trim().parse::<u16>().ok())
            .filter(|code| *code != 0);
        parsed.content_type = fields.next().map(str::to_string);
        parsed.effective_url = fields
            .next()
            .map(str::to_string)
            .filter(|u| !u.is_empty());
    }

    if let Some(code) = parsed.status_code {
        if !(200..300).contains(&code) {
            return Err(FetchError::HttpError(code));
        }
    }

    if parsed.body.trim().is_empty() {
        return Err(FetchError::Other("empty output".to_string()));
    }

    Ok(parsed)
}

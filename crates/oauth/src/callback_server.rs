use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    axum::{Router, extract::Query, response::Html, routing::get},
    tokio::{net::TcpListener, sync::oneshot},
};

use crate::error::{Error, Result};

/// How long the browser round trip may take.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// One-shot loopback HTTP server that receives the OAuth redirect.
pub struct CallbackServer {
    listener: TcpListener,
}

impl CallbackServer {
    /// Bind an ephemeral port on 127.0.0.1.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    /// Redirect URI to register in the authorization request.
    pub fn redirect_uri(&self) -> Result<String> {
        let addr = self.listener.local_addr()?;
        Ok(format!("http://127.0.0.1:{}/", addr.port()))
    }

    /// Serve until a GET `/` with matching `state` and a `code` arrives, then
    /// return the code. Fails on state mismatch, provider error, or timeout.
    pub async fn wait_for_code(self, expected_state: String, timeout: Duration) -> Result<String> {
        let (tx, rx) = oneshot::channel::<Result<String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let app = Router::new().route(
            "/",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let tx = tx.lock().unwrap_or_else(|e| e.into_inner()).take();
                async move {
                    let outcome = check_callback(&params, &expected_state);
                    let page = match &outcome {
                        Ok(_) => "<h1>Authentication successful!</h1><p>You can close this window.</p>"
                            .to_string(),
                        Err(e) => format!("<h1>Authentication failed</h1><p>{e}</p>"),
                    };
                    if let Some(tx) = tx {
                        let _ = tx.send(outcome.map_err(Error::message));
                    }
                    Html(page)
                }
            }),
        );

        let server = axum::serve(self.listener, app);

        tokio::select! {
            result = rx => {
                result.map_err(|_| Error::message("OAuth callback channel closed"))?
            }
            _ = server.into_future() => {
                Err(Error::message("OAuth callback server exited unexpectedly"))
            }
            _ = tokio::time::sleep(timeout) => {
                Err(Error::message(format!(
                    "OAuth callback timed out after {} seconds",
                    timeout.as_secs()
                )))
            }
        }
    }
}

fn check_callback(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> std::result::Result<String, String> {
    if let Some(err) = params.get("error") {
        return Err(format!("authorization denied: {err}"));
    }
    let state = params.get("state").ok_or("missing state")?;
    if state != expected_state {
        return Err("state mismatch".into());
    }
    params
        .get("code")
        .cloned()
        .ok_or_else(|| "missing code".into())
}

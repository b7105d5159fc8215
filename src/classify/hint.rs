//! Diagnostic-hint derivation for misrouted responses.

use url::Url;

/// Dev-server ports that serve the frontend, not the API.
const FRONTEND_PORTS: [u16; 4] = [3000, 4200, 5173, 8080];

/// Derive a human-actionable hint from the failure context of a misrouted
/// response. Checks run most-specific first; the generic fallback always
/// produces something.
pub fn diagnostic_hint(request_url: &str, body: &str) -> String {
    if super::has_spa_shell_marker(body) {
        return "response body contains a single-page-app shell; the reverse proxy is \
                likely serving the frontend for API paths - check that API routes are \
                matched before the static-file fallback"
            .to_string();
    }

    if let Ok(url) = Url::parse(request_url) {
        if let Some(port) = url.port() {
            if FRONTEND_PORTS.contains(&port) {
                return format!(
                    "request went to port {port}, a common frontend dev-server port - \
                     the API base URL probably points at the frontend instead of the backend"
                );
            }
        }

        if let Some(doubled) = doubled_prefix(url.path()) {
            return format!(
                "request path repeats its leading segment (\"/{doubled}/{doubled}/...\") - \
                 the configured base URL likely already includes the \"/{doubled}\" prefix"
            );
        }
    }

    "got an HTML page where JSON was expected - check the reverse proxy configuration \
     and that the backend is running and reachable"
        .to_string()
}

/// Returns the leading path segment when it appears twice in a row
/// (`/api/api/users` -> `api`).
fn doubled_prefix(path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let second = segments.next()?;
    if first == second {
        Some(first.to_string())
    } else {
        None
    }
}

//! HTML pages rendered by the authorization callback.

const STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #34a853 0%, #1a73e8 100%);
        }
        .container {
            background: white;
            padding: 3rem;
            border-radius: 1rem;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 520px;
            text-align: center;
        }
        h1 { color: #202124; margin-bottom: 1rem; }
        h1.failed { color: #d93025; }
        .token-box {
            background: #f8f9fa;
            border: 2px solid #dadce0;
            padding: 1.5rem;
            border-radius: 0.5rem;
            margin: 1.5rem 0;
        }
        .token {
            font-family: 'Courier New', monospace;
            font-size: 0.9rem;
            word-break: break-all;
            color: #202124;
            user-select: all;
        }
        .copy-button {
            background: #1a73e8;
            color: white;
            border: none;
            padding: 0.75rem 2rem;
            border-radius: 0.5rem;
            font-size: 1rem;
            cursor: pointer;
        }
        .copy-button:hover { background: #1765cc; }
        .copied { color: #188038; font-weight: bold; margin-top: 0.5rem; opacity: 0; transition: opacity 0.3s; }
        .copied.show { opacity: 1; }
        .error-message {
            background: #fce8e6;
            border: 1px solid #f6aea9;
            color: #a50e0e;
            padding: 1rem;
            border-radius: 0.5rem;
            margin-top: 1rem;
        }
        .hint { margin-top: 2rem; color: #5f6368; }
"#;

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
{body}
    </div>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Shows a token the user has to paste into the plugin host.
pub fn token_page(token_label: &str, token: &str) -> String {
    let body = format!(
        r#"        <h1>Authorization Successful!</h1>
        <p>Copy your {label} and paste it into your chat tool's plugin settings:</p>

        <div class="token-box">
            <div class="token" id="sessionToken">{token}</div>
        </div>

        <button class="copy-button" onclick="copyToken()">Copy</button>
        <div class="copied" id="copiedMsg">Copied to clipboard!</div>

        <p class="hint">Keep it private: anyone holding it can read and edit your sheets.</p>

    <script>
        function copyToken() {{
            const tokenText = document.getElementById('sessionToken').textContent;
            navigator.clipboard.writeText(tokenText).then(() => {{
                const copiedMsg = document.getElementById('copiedMsg');
                copiedMsg.classList.add('show');
                setTimeout(() => copiedMsg.classList.remove('show'), 2000);
            }});
        }}
    </script>"#,
        label = escape_html(token_label),
        token = escape_html(token),
    );
    layout("Authorization Successful", &body)
}

/// Confirmation after a cookie session was set.
pub fn signed_in_page() -> String {
    layout(
        "Signed In",
        r#"        <h1>Signed in with Google</h1>
        <p>Your Drive and Sheets are now available to the plugin.</p>
        <p class="hint">You can close this window.</p>"#,
    )
}

/// Closes the popup the plugin host opened for the consent screen.
pub fn close_window_page() -> String {
    layout(
        "Authorization Complete",
        r#"        <h1>Authorization complete</h1>
        <p class="hint">This window will close automatically.</p>
    <script>
        if (window.opener) {
            window.opener.postMessage({ type: 'google-auth-complete' }, '*');
        }
        window.close();
    </script>"#,
    )
}

pub fn failure_page(error: &str, description: &str) -> String {
    let body = format!(
        r#"        <h1 class="failed">Authorization Failed</h1>
        <p><strong>Error:</strong> {error}</p>
        <div class="error-message">{description}</div>
        <p class="hint">Close this window and start the sign-in again.</p>"#,
        error = escape_html(error),
        description = escape_html(description),
    );
    layout("Authorization Failed", &body)
}

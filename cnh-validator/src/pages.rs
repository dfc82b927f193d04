//! Inline HTML for the browser-facing pages.

const STYLE: &str = r#"
        body {
            margin: 0;
            padding: 0;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            background: linear-gradient(135deg, #0f766e 0%, #1e3a8a 100%);
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
        }
        .container {
            background: white;
            border-radius: 12px;
            padding: 48px;
            box-shadow: 0 8px 32px rgba(0, 0, 0, 0.1);
            text-align: center;
            max-width: 420px;
        }
        .icon {
            width: 64px;
            height: 64px;
            border-radius: 50%;
            color: white;
            display: inline-flex;
            align-items: center;
            justify-content: center;
            font-size: 32px;
            margin-bottom: 24px;
        }
        .icon.success { background: #10B981; }
        .icon.error { background: #EF4444; }
        h1 {
            color: #1F2937;
            margin: 0 0 12px 0;
            font-size: 24px;
            font-weight: 600;
        }
        p, label {
            color: #6B7280;
            margin: 0 0 24px 0;
            line-height: 1.5;
        }
        label { display: block; text-align: left; margin-bottom: 16px; }
        input[type=file] { display: block; margin-top: 8px; }
        button, a.button {
            background: #1e3a8a;
            color: white;
            border: none;
            border-radius: 8px;
            padding: 12px 24px;
            font-size: 16px;
            cursor: pointer;
            text-decoration: none;
        }
        .error-details {
            background: #FEE2E2;
            border-radius: 8px;
            padding: 16px;
            color: #991B1B;
            font-size: 14px;
            margin-bottom: 24px;
        }
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Document Validation</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>Document Validation</h1>
        <p>Validate your driver's license (CNH) with a photo of the document, its QR code and a quick liveness check.</p>
        <a class="button" href="/validation/cnh/">Start</a>
    </div>
</body>
</html>"#;

const UPLOAD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>CNH Validation</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>CNH Validation</h1>
        <form id="validation-form">
            <label>Front of the document
                <input type="file" name="cnh_front" accept="image/*" required>
            </label>
            <label>QR code
                <input type="file" name="cnh_qrcode" accept="image/*" required>
            </label>
            <div id="error" class="error-details" hidden></div>
            <button type="submit">Continue</button>
        </form>
    </div>
    <script>
        const form = document.getElementById("validation-form");
        const errorBox = document.getElementById("error");
        form.addEventListener("submit", async (event) => {
            event.preventDefault();
            errorBox.hidden = true;
            try {
                const response = await fetch(window.location.pathname, {
                    method: "POST",
                    body: new FormData(form),
                });
                const isJson = (response.headers.get("content-type") || "").includes("application/json");
                const body = isJson ? await response.json() : {};
                if (response.ok && body.liveness_url) {
                    window.location.href = body.liveness_url;
                    return;
                }
                if (response.status === 413) {
                    errorBox.textContent = "The images are too large. Please upload smaller files.";
                } else {
                    errorBox.textContent = body.message || "Validation failed.";
                }
            } catch (err) {
                errorBox.textContent = "Could not reach the server.";
            }
            errorBox.hidden = false;
        });
    </script>
</body>
</html>"#;

const SUCCESS_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Validation Successful</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <div class="icon success">✓</div>
        <h1>{GREETING}</h1>
        <p>Your document was validated successfully. You can now close this window.</p>
    </div>
</body>
</html>"#;

const ERROR_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Validation Error</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <div class="icon error">✗</div>
        <h1>Validation Failed</h1>
        <div class="error-details">{ERROR}</div>
        <a class="button" href="/validation/cnh/">Try again</a>
    </div>
</body>
</html>"#;

pub fn index_page() -> String {
    INDEX_HTML.replace("{STYLE}", STYLE)
}

pub fn upload_page() -> String {
    UPLOAD_HTML.replace("{STYLE}", STYLE)
}

pub fn success_page(display_name: Option<&str>) -> String {
    let greeting = match display_name {
        Some(name) => format!("Thank you, {}!", html_escape(name)),
        None => "Thank you!".to_string(),
    };
    SUCCESS_HTML_TEMPLATE
        .replace("{STYLE}", STYLE)
        .replace("{GREETING}", &greeting)
}

pub fn error_page(message: &str) -> String {
    ERROR_HTML_TEMPLATE
        .replace("{STYLE}", STYLE)
        .replace("{ERROR}", &html_escape(message))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

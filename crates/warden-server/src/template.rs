//! HTML rendering
//!
//! Every value that came from the client or the directory passes through
//! [`escape_html`] before it is written into a page.

use std::fmt::Write;

/// Escape text for use in HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}

/// Login form posting to `login`; `page` and `params` ride along as hidden fields
pub fn login_form(page: &str, params: &str) -> String {
    let body = format!(
        concat!(
            "<h1>Log in</h1>\n",
            "<form action=\"login\" method=\"post\">\n",
            "<input type=\"hidden\" name=\"page\" value=\"{}\">\n",
            "<input type=\"hidden\" name=\"params\" value=\"{}\">\n",
            "<label>Username <input type=\"text\" name=\"username\" autofocus></label>\n",
            "<label>Password <input type=\"password\" name=\"password\"></label>\n",
            "<button type=\"submit\">Log in</button>\n",
            "</form>\n"
        ),
        escape_html(page),
        escape_html(params)
    );
    document("Log in", &body)
}

/// Landing page for a session that is already logged in
pub fn logged_in(identity: &str, page: &str) -> String {
    let body = format!(
        "<p>Logged in as {}.</p>\n<p><a href=\"{}\">Continue</a> | <a href=\"logout\">Log out</a></p>\n",
        escape_html(identity),
        escape_html(page)
    );
    document("Logged in", &body)
}

/// The `list` page: the pages this session may visit
pub fn page_list(identity: &str, pages: &[&str]) -> String {
    let mut body = format!("<h1>Welcome, {}</h1>\n<ul>\n", escape_html(identity));
    for page in pages {
        let _ = writeln!(
            body,
            "<li><a href=\"{0}\">{0}</a></li>",
            escape_html(page)
        );
    }
    body.push_str("</ul>\n<p><a href=\"logout\">Log out</a></p>\n");
    document("Pages", &body)
}

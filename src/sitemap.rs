//! sitemap.xml generation

use chrono::NaiveDate;

/// Public pages that always exist, with their change frequency and priority
const STATIC_PAGES: &[(&str, &str, &str)] = &[
    ("/", "daily", "1.0"),
    ("/packages", "daily", "0.9"),
    ("/centers", "weekly", "0.7"),
    ("/volunteer", "weekly", "0.7"),
    ("/blog", "weekly", "0.8"),
    ("/about", "monthly", "0.5"),
    ("/contact", "monthly", "0.5"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub path: String,
    pub last_modified: Option<NaiveDate>,
    pub change_frequency: &'static str,
    pub priority: &'static str,
}

impl SitemapEntry {
    pub fn page(path: impl Into<String>, last_modified: NaiveDate) -> Self {
        Self {
            path: path.into(),
            last_modified: Some(last_modified),
            change_frequency: "weekly",
            priority: "0.8",
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Static pages followed by `dynamic` entries, rooted at `base_url`
pub fn build(base_url: &str, dynamic: &[SitemapEntry]) -> String {
    let base = base_url.trim_end_matches('/');
    let statics = STATIC_PAGES.iter().map(|(path, freq, priority)| SitemapEntry {
        path: path.to_string(),
        last_modified: None,
        change_frequency: freq,
        priority,
    });

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in statics.chain(dynamic.iter().cloned()) {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}{}</loc>\n", escape(base), escape(&entry.path)));
        if let Some(date) = entry.last_modified {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", date.format("%Y-%m-%d")));
        }
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", entry.change_frequency));
        xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

// SVG renderer.
// Rewrites the text of id-tagged elements in the profile templates.

use std::path::Path;

use chrono::{Datelike, Months, NaiveDate};
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::cache::write_text;
use crate::collector::ProfileStats;
use crate::error::Result;

/// Column widths used to right-align values with dot leaders.
const DOT_WIDTHS: [(&str, usize); 8] = [
    ("commit_data", 22),
    ("star_data", 14),
    ("repo_data", 6),
    ("contrib_data", 0),
    ("follower_data", 10),
    ("loc_data", 9),
    ("loc_add", 0),
    ("loc_del", 7),
];

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Time since `birthday` as "X years, Y months, Z days", with a cake on the day itself.
pub fn age_string(birthday: NaiveDate, today: NaiveDate) -> String {
    let mut months = (today.year() - birthday.year()) * 12 + today.month() as i32
        - birthday.month() as i32;
    let anchor = |months: i32| {
        u32::try_from(months)
            .ok()
            .and_then(|m| birthday.checked_add_months(Months::new(m)))
    };
    while months > 0 && anchor(months).is_none_or(|date| date > today) {
        months -= 1;
    }
    let months = months.max(0);
    let days = anchor(months)
        .map(|date| (today - date).num_days().max(0))
        .unwrap_or(0) as u32;
    let years = months as u32 / 12;
    let months = months as u32 % 12;

    format!(
        "{} year{}, {} month{}, {} day{}{}",
        years,
        plural(years),
        months,
        plural(months),
        days,
        plural(days),
        if months == 0 && days == 0 { " 🎂" } else { "" }
    )
}

/// Format with thousands separators, e.g. 1234567 -> "1,234,567".
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_signed(n: i64) -> String {
    let formatted = format_count(n.unsigned_abs());
    if n < 0 {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Dot leader padding `value` out to `width` characters.
pub fn dot_leader(value: &str, width: usize) -> String {
    match width.saturating_sub(value.chars().count()) {
        0 => String::new(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => format!(" {} ", ".".repeat(n)),
    }
}

/// Element id to text, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderValues {
    entries: Vec<(&'static str, String)>,
}

impl RenderValues {
    pub fn from_stats(stats: &ProfileStats, birthday: Option<NaiveDate>, today: NaiveDate) -> Self {
        let mut entries = Vec::new();
        if let Some(birthday) = birthday {
            entries.push(("age_data", age_string(birthday, today)));
        }
        entries.extend([
            ("commit_data", format_count(stats.loc.matching_commits)),
            ("star_data", format_count(stats.stars)),
            ("repo_data", format_count(stats.repositories)),
            ("contrib_data", format_count(stats.contributed_repositories)),
            ("follower_data", format_count(stats.followers)),
            ("loc_data", format_signed(stats.loc.net_lines())),
            ("loc_add", format_count(stats.loc.lines_added)),
            ("loc_del", format_count(stats.loc.lines_deleted)),
        ]);
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(id, value)| (*id, value.as_str()))
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace the text content of the element carrying `id`. Returns false when absent.
pub fn fill_element(svg: &mut String, id: &str, value: &str) -> Result<bool> {
    let pattern = format!(
        r#"(<[A-Za-z][^<>]*\sid="{}"[^<>]*>)[^<]*"#,
        regex::escape(id)
    );
    let re = Regex::new(&pattern)?;
    if !re.is_match(svg) {
        return Ok(false);
    }
    let escaped = escape_xml(value);
    let filled = re
        .replace_all(svg, |caps: &Captures| format!("{}{}", &caps[1], escaped))
        .into_owned();
    *svg = filled;
    Ok(true)
}

/// Fill every value (and its dot leader, if the template has one) into `svg`.
pub fn fill_template(svg: &mut String, values: &RenderValues) -> Result<()> {
    for (id, value) in values.iter() {
        if !fill_element(svg, id, value)? {
            warn!("Template has no element with id {}", id);
            continue;
        }
        if let Some((_, width)) = DOT_WIDTHS.iter().find(|(key, _)| *key == id) {
            let dots_id = format!("{}_dots", id);
            fill_element(svg, &dots_id, &dot_leader(value, *width))?;
        }
    }
    Ok(())
}

/// Rewrite the SVG at `path` in place.
pub fn overwrite_svg(path: &Path, values: &RenderValues) -> Result<()> {
    let mut svg = std::fs::read_to_string(path)?;
    fill_template(&mut svg, values)?;
    write_text(path, &svg)?;
    debug!("Rendered {}", path.display());
    Ok(())
}

//! Display formatters shared by API responses and email templates.

/// "in_progress" -> "In Progress"
pub fn format_status(status: &str) -> String {
    status
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    match s.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => s,
    }
}

/// 1536 -> "1.5 KB"
pub fn format_file_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= GB {
        format!("{} GB", trim_decimal(bytes_f / GB))
    } else if bytes_f >= MB {
        format!("{} MB", trim_decimal(bytes_f / MB))
    } else if bytes_f >= KB {
        format!("{} KB", trim_decimal(bytes_f / KB))
    } else {
        format!("{} B", bytes)
    }
}

/// 1500 -> "1.5K"
pub fn format_number(n: i64) -> String {
    let n_f = n as f64;
    if n_f >= 1_000_000.0 {
        format!("{}M", trim_decimal(n_f / 1_000_000.0))
    } else if n_f >= 1_000.0 {
        format!("{}K", trim_decimal(n_f / 1_000.0))
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_words_are_title_cased() {
        assert_eq!(format_status("in_progress"), "In Progress");
        assert_eq!(format_status("approved"), "Approved");
        assert_eq!(format_status("needs_review"), "Needs Review");
    }

    #[test]
    fn file_sizes_use_one_trimmed_decimal() {
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024 / 2), "1.5 GB");
    }

    #[test]
    fn numbers_abbreviate_thousands_and_millions() {
        assert_eq!(format_number(1500), "1.5K");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(2_000_000), "2M");
    }
}

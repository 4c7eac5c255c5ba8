//! Marker extraction over loosely structured firmware output.
//!
//! Nothing here validates a grammar. A missing or truncated marker yields
//! `None` and the caller skips that channel.

/// Value between `<tag>` and `</tag>`, trimmed
pub fn tag_value<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let len = body[start..].find(&close)?;
    Some(body[start..start + len].trim())
}

/// Value of a JavaScript-style `var name="value"` assignment.
///
/// `prefix` is everything up to and including the opening quote, e.g.
/// `var name_1="`. The value runs to the next double quote.
pub fn quoted_value<'a>(body: &'a str, prefix: &str) -> Option<&'a str> {
    let start = body.find(prefix)? + prefix.len();
    let len = body[start..].find('"')?;
    Some(&body[start..start + len])
}

/// `var name="1"` is true, any other value false; `None` when the assignment is absent
pub fn var_flag(body: &str, name: &str) -> Option<bool> {
    quoted_value(body, &format!("var {}=\"", name)).map(|value| value == "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_value() {
        let body = "<CGI_Result><result>0</result><isEnable> 1 </isEnable></CGI_Result>";
        assert_eq!(tag_value(body, "result"), Some("0"));
        assert_eq!(tag_value(body, "isEnable"), Some("1"));
        assert_eq!(tag_value(body, "sensitivity"), None);
    }

    #[test]
    fn test_tag_value_unterminated() {
        assert_eq!(tag_value("<soundAlarm>2", "soundAlarm"), None);
    }

    #[test]
    fn test_quoted_value() {
        let body = "var show_1=\"1\";\r\nvar name_1=\"Front Door\";\r\n";
        assert_eq!(quoted_value(body, "var name_1=\""), Some("Front Door"));
        assert_eq!(quoted_value(body, "var name_2=\""), None);
        assert_eq!(quoted_value("var name_1=\"cut off", "var name_1=\""), None);
    }

    #[test]
    fn test_var_flag() {
        assert_eq!(var_flag("var m1_enable=\"1\";", "m1_enable"), Some(true));
        assert_eq!(var_flag("var m1_enable=\"0\";", "m1_enable"), Some(false));
        assert_eq!(var_flag("var m1_enable=\"1", "m1_enable"), None);
        assert_eq!(var_flag("<html>401 Unauthorized</html>", "m1_enable"), None);
    }
}

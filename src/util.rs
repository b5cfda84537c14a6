//! Small utility helpers used across modules.

use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Opaque lowercase base36 token for UI keys. Not collision-proof, not for secrets.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
  (0..22)
    .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
    .collect()
}

/// Returns the first balanced `{ ... }` span in free-form model output.
///
/// Braces inside JSON string literals are ignored, so `"a {b}"` does not close
/// the object early. Returns `None` when there is no opening brace or the
/// object never closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (offset, ch) in text[start..].char_indices() {
    if in_string {
      if escaped {
        escaped = false;
      } else if ch == '\\' {
        escaped = true;
      } else if ch == '"' {
        in_string = false;
      }
      continue;
    }
    match ch {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&text[start..start + offset + 1]);
        }
      }
      _ => {}
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;

  #[test]
  fn template_replaces_every_placeholder() {
    let out = fill_template("{count} questions about {category} ({count})", &[("count", "5"), ("category", "Music")]);
    assert_eq!(out, "5 questions about Music (5)");
  }

  #[test]
  fn trunc_respects_char_boundaries() {
    let s = "ééééé";
    let out = trunc_for_log(s, 3);
    assert!(out.starts_with('é'));
    assert!(out.ends_with("(10 bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }

  #[test]
  fn random_ids_are_base36_and_distinct() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(5);
    let a = random_id(&mut rng);
    let b = random_id(&mut rng);
    assert_eq!(a.len(), 22);
    assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert_ne!(a, b);
  }

  #[test]
  fn extracts_object_wrapped_in_markdown() {
    let text = "Sure! Here it is:\n```json\n{\"title\": \"T\", \"nested\": {\"a\": 1}}\n```\nEnjoy {not this}";
    assert_eq!(extract_json_object(text), Some("{\"title\": \"T\", \"nested\": {\"a\": 1}}"));
  }

  #[test]
  fn braces_inside_strings_do_not_count() {
    let text = r#"{"q": "what is } or \" { ?", "n": 2} trailing }"#;
    assert_eq!(extract_json_object(text), Some(r#"{"q": "what is } or \" { ?", "n": 2}"#));
  }

  #[test]
  fn no_object_yields_none() {
    assert_eq!(extract_json_object("I cannot help with that."), None);
    assert_eq!(extract_json_object("{\"unterminated\": true"), None);
  }
}

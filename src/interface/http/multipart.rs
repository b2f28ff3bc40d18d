use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("malformed multipart body: {0}")]
    Malformed(&'static str),
}

/// One decoded part of a multipart/form-data body.
#[derive(Clone, Debug)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extracts the boundary token from a Content-Type header value.
pub fn boundary_from_content_type(value: &str) -> Option<String> {
    let (mime, rest) = value.split_once(';')?;
    if !mime.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    for param in rest.split(';') {
        let (key, raw) = match param.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let raw = raw.trim();
            let token = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')).unwrap_or(raw);
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Minimal multipart/form-data parser: split on the dash-boundary, peel the
/// part headers at the first CRLFCRLF, trim the trailing CRLF from the data.
pub fn parse(body: &[u8], boundary: &str) -> Result<Vec<Part>, MultipartError> {
    let delimiter = format!("--{}", boundary);
    let delimiter = delimiter.as_bytes();

    let mut parts = Vec::new();
    let mut pos = find(body, delimiter, 0).ok_or(MultipartError::Malformed("no boundary"))?;
    pos += delimiter.len();

    loop {
        // Closing delimiter is "--boundary--".
        if body[pos..].starts_with(b"--") {
            break;
        }
        // Skip the CRLF after the delimiter.
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        }

        let next = find(body, delimiter, pos).ok_or(MultipartError::Malformed("unterminated part"))?;
        let segment = &body[pos..next];
        parts.push(parse_part(segment)?);
        pos = next + delimiter.len();
    }

    Ok(parts)
}

fn parse_part(segment: &[u8]) -> Result<Part, MultipartError> {
    let header_end =
        find(segment, b"\r\n\r\n", 0).ok_or(MultipartError::Malformed("part without headers"))?;
    let headers = String::from_utf8_lossy(&segment[..header_end]);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.lines() {
        let (key, value) = match line.split_once(':') {
            Some(kv) => kv,
            None => continue,
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if key == "content-disposition" {
            name = param_value(value, "name");
            filename = param_value(value, "filename");
        } else if key == "content-type" {
            content_type = Some(value.to_string());
        }
    }

    let mut data = segment[header_end + 4..].to_vec();
    // The CRLF before the next delimiter belongs to the framing, not the data.
    if data.ends_with(b"\r\n") {
        data.truncate(data.len() - 2);
    }

    Ok(Part {
        name: name.ok_or(MultipartError::Malformed("part without a name"))?,
        filename,
        content_type,
        data,
    })
}

fn param_value(header: &str, param: &str) -> Option<String> {
    for piece in header.split(';') {
        let (key, raw) = match piece.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        if key.trim().eq_ignore_ascii_case(param) {
            let raw = raw.trim();
            let value = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')).unwrap_or(raw);
            return Some(value.to_string());
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

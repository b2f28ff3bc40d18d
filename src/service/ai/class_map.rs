use std::path::Path;

use anyhow::{Context, Result};

use crate::shared::config::{self, ClassifierConfig};

/// Label vocabulary mapping classifier score indices to display names.
/// Loaded once at startup from a remote CSV (cached on disk); never mutated.
#[derive(Clone, Debug, Default)]
pub struct ClassMap {
    names: Vec<String>,
}

impl ClassMap {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for a score index, `Class_<i>` when out of vocabulary.
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Class_{}", index))
    }
}

/// Load the class map: disk cache first, remote CSV otherwise. Failure is
/// not fatal; the classifier degrades to `Class_<i>` labels.
pub async fn load_or_fetch(cfg: &ClassifierConfig) -> ClassMap {
    match load_or_fetch_inner(cfg).await {
        Ok(map) => {
            log::info!("[class_map] loaded {} class labels", map.len());
            map
        }
        Err(err) => {
            log::error!("[class_map] load failed: {err:?}");
            ClassMap::empty()
        }
    }
}

async fn load_or_fetch_inner(cfg: &ClassifierConfig) -> Result<ClassMap> {
    if !cfg.class_map_path.exists() {
        fetch_to_file(&cfg.class_map_url, &cfg.class_map_path).await?;
    }
    let text = tokio::fs::read_to_string(&cfg.class_map_path)
        .await
        .with_context(|| format!("read class map: {:?}", cfg.class_map_path))?;
    let names = parse_display_names(&text);
    if names.is_empty() {
        anyhow::bail!("class map has no rows");
    }
    Ok(ClassMap::new(names))
}

async fn fetch_to_file(url: &str, dest: &Path) -> Result<()> {
    log::info!("[class_map] downloading {}", url);
    let client = super::http_client(config::timeouts().fetch_http)?;
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("class map fetch failed: {}", status);
    }
    let body = resp.bytes().await?;
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(dest, &body)
        .await
        .with_context(|| format!("write class map: {dest:?}"))?;
    Ok(())
}

/// Extract the `display_name` column (third field) from the AudioSet class
/// map CSV. The header row is skipped; display names may be quoted and
/// contain commas.
fn parse_display_names(text: &str) -> Vec<String> {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_record(line).into_iter().nth(2))
        .collect()
}

fn parse_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // Doubled quote inside a quoted field is an escaped quote.
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "index,mid,display_name\n\
        0,/m/09x0r,Speech\n\
        1,/m/03qc9zr,Screaming\n\
        2,/m/032s66,\"Gunshot, gunfire\"\n";

    #[test]
    fn parses_display_names_and_skips_header() {
        let names = parse_display_names(SAMPLE_CSV);
        assert_eq!(names, vec!["Speech", "Screaming", "Gunshot, gunfire"]);
    }

    #[test]
    fn quoted_field_keeps_embedded_comma() {
        let record = parse_record("2,/m/032s66,\"Gunshot, gunfire\"");
        assert_eq!(record[2], "Gunshot, gunfire");
    }

    #[test]
    fn doubled_quotes_unescape() {
        let record = parse_record("0,x,\"say \"\"hi\"\"\"");
        assert_eq!(record[2], "say \"hi\"");
    }

    #[test]
    fn out_of_vocabulary_index_gets_placeholder() {
        let map = ClassMap::new(vec!["Speech".to_string()]);
        assert_eq!(map.name(0), "Speech");
        assert_eq!(map.name(7), "Class_7");
    }
}

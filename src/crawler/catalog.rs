//! Mailing list catalog
//!
//! Enumerates the lists published on the archive's directory page (the mailman
//! `listinfo` page) and drops the ones matched by the exclusion set.

use crate::crawler::fetcher::FetchClient;
use crate::model::MailingList;
use crate::url::{is_excluded, list_id_from_href};
use crate::HarvestError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// The archive's set of mailing lists
#[derive(Debug, Clone)]
pub struct ListCatalog {
    catalog_url: Url,
    exclude: Vec<String>,
}

impl ListCatalog {
    /// Creates a catalog reading `catalog_url` and excluding `exclude` patterns
    pub fn new(catalog_url: &str, exclude: Vec<String>) -> Result<Self, HarvestError> {
        Ok(Self {
            catalog_url: Url::parse(catalog_url)?,
            exclude: exclude.into_iter().map(|p| p.to_lowercase()).collect(),
        })
    }

    /// Fetches the directory page and returns every list not excluded, in page order
    pub async fn enumerate_lists(
        &self,
        client: &FetchClient,
    ) -> Result<Vec<MailingList>, HarvestError> {
        tracing::info!("Fetching list catalog from {}", self.catalog_url);
        let body = client.fetch(&self.catalog_url).await?;
        let lists = self.filter(parse_catalog(&body));
        tracing::info!("Catalog lists {} mailing lists", lists.len());
        Ok(lists)
    }

    /// Applies the exclusion set
    pub fn filter(&self, lists: Vec<MailingList>) -> Vec<MailingList> {
        lists
            .into_iter()
            .filter(|list| {
                let excluded = is_excluded(list.id(), &self.exclude);
                if excluded {
                    tracing::debug!("Excluding list {}", list);
                }
                !excluded
            })
            .collect()
    }
}

/// Parses a mailman directory page into list ids
///
/// Every link inside the directory table that points at a `listinfo/<id>` page names
/// one list. Duplicates are dropped, first occurrence wins.
pub fn parse_catalog(html: &str) -> Vec<MailingList> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut lists = Vec::new();

    let Ok(link_selector) = Selector::parse("table a[href]") else {
        return lists;
    };

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if !href.contains("listinfo/") {
            continue;
        }

        if let Some(id) = list_id_from_href(href) {
            if seen.insert(id.clone()) {
                lists.push(MailingList::new(&id));
            }
        }
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r##"
<html><body>
<table border="2" width="100%">
  <tr><td colspan="2" bgcolor="#99CCFF"><b>mail.example.org Mailing Lists</b></td></tr>
  <tr><td colspan="2">Below is a listing of all the public mailing lists.
      <a href="../admin">admin overview</a></td></tr>
  <tr><td><b>List</b></td><td><b>Description</b></td></tr>
  <tr><td><a href="listinfo/Python-Dev"><strong>Python-Dev</strong></a></td>
      <td>Python core developers</td></tr>
  <tr><td><a href="listinfo/python-checkins"><strong>Python-checkins</strong></a></td>
      <td>Commit notifications</td></tr>
  <tr><td><a href="listinfo/pypy-commit"><strong>pypy-commit</strong></a></td>
      <td>PyPy commits</td></tr>
  <tr><td><a href="listinfo/python-ideas/"><strong>Python-ideas</strong></a></td>
      <td>Ideas</td></tr>
  <tr><td><a href="listinfo/python-dev">duplicate</a></td><td></td></tr>
</table>
<a href="listinfo/outside-table">not in the directory</a>
</body></html>
"##;

    fn ids(lists: &[MailingList]) -> Vec<&str> {
        lists.iter().map(|l| l.id()).collect()
    }

    #[test]
    fn test_parse_catalog() {
        let lists = parse_catalog(CATALOG);
        assert_eq!(
            ids(&lists),
            vec!["python-dev", "python-checkins", "pypy-commit", "python-ideas"]
        );
    }

    #[test]
    fn test_parse_catalog_without_table() {
        assert!(parse_catalog("<html><body><p>maintenance</p></body></html>").is_empty());
    }

    #[test]
    fn test_filter_applies_exclusions() {
        let catalog = ListCatalog::new(
            "https://mail.example.org/mailman/listinfo",
            vec!["Python-Checkins".to_string(), "pypy-*".to_string()],
        )
        .unwrap();

        let lists = catalog.filter(parse_catalog(CATALOG));
        assert_eq!(ids(&lists), vec!["python-dev", "python-ideas"]);
    }

    #[test]
    fn test_empty_exclusion_set_keeps_everything() {
        let catalog = ListCatalog::new("https://mail.example.org/mailman/listinfo", vec![]).unwrap();
        assert_eq!(catalog.filter(parse_catalog(CATALOG)).len(), 4);
    }
}

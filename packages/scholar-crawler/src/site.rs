//! Where things live on Google Scholar pages, and how its URLs are built.

use url::Url;

use crate::error::{CrawlError, CrawlResult};

pub const DEFAULT_BASE_URL: &str = "https://scholar.google.com/";
pub const DEFAULT_SEARCH_URL: &str = "https://scholar.google.com/?hl=en&as_sdt=0,5";

/// Lists a profile's articles newest first.
const ORDER_BY_YEAR_SUFFIX: &str = "&view_op=list_works&sortby=pubdate";

/// Profile page selectors.
pub mod profile {
    pub const NAME: &str = "div#gsc_prf_in";
    pub const BRIEF: &str = "div#gsc_prf_w";
    pub const CITED_STATS: &str = "table#gsc_rsb_st";
    pub const HOMEPAGE: &str = "div#gsc_prf_ivh a.gsc_prf_ila";
    pub const CO_AUTHORS: &str = "ul.gsc_rsb_a li a";
    pub const ARTICLE_TITLES: &str = "a.gsc_a_at";
    pub const TAGS: &str = "a.gsc_prf_inta.gs_ibl";
}

/// Search page selectors.
pub mod search {
    pub const QUERY_INPUT: &str = "input#gs_hdr_tsi";
    pub const NEXT_PAGE: &str = r#"td[align="left"]"#;
    pub const RESULT_ITEM: &str = "div.gs_r.gs_or.gs_scl";
    pub const RESULT_LINK: &str = "h3.gs_rt a";
    pub const RESULT_AUTHORS: &str = "div.gs_a a";
    pub const CITE_BUTTON: &str = "a.gs_or_cit";
    pub const CITE_FORMATS: &str = "div#gs_cit a.gs_citi";
    pub const CITE_CLOSE: &str = "div#gs_cit a#gs_cit-x";
    /// Label of the export link in the citation dialog
    pub const ENDNOTE_LABEL: &str = "EndNote";
}

/// Absolute URL for a (possibly relative) profile reference.
pub fn profile_url(base_url: &str, reference: &str, order_by_year: bool) -> CrawlResult<String> {
    let invalid = |source| CrawlError::InvalidUrl {
        url: reference.to_string(),
        source,
    };
    let base = Url::parse(base_url).map_err(invalid)?;
    let mut url = base.join(reference).map_err(invalid)?.to_string();
    if order_by_year {
        url.push_str(ORDER_BY_YEAR_SUFFIX);
    }
    Ok(url)
}

/// Search box query for an author, optionally narrowed by a keyword.
pub fn author_query(author: &str, keyword: Option<&str>) -> String {
    let mut query = format!("author:\"{author}\"");
    if let Some(keyword) = keyword.filter(|k| !k.is_empty()) {
        query.push(' ');
        query.push_str(keyword);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_url_relative() {
        let url = profile_url(DEFAULT_BASE_URL, "/citations?user=ABC&hl=en", false).unwrap();
        assert_eq!(url, "https://scholar.google.com/citations?user=ABC&hl=en");
    }

    #[test]
    fn test_profile_url_order_by_year() {
        let url = profile_url(DEFAULT_BASE_URL, "/citations?user=ABC", true).unwrap();
        assert_eq!(
            url,
            "https://scholar.google.com/citations?user=ABC&view_op=list_works&sortby=pubdate"
        );
    }

    #[test]
    fn test_profile_url_absolute_reference_wins() {
        let url = profile_url(DEFAULT_BASE_URL, "https://mirror.example/citations?user=Z", false)
            .unwrap();
        assert_eq!(url, "https://mirror.example/citations?user=Z");
    }

    #[test]
    fn test_author_query() {
        assert_eq!(author_query("Ada Lovelace", None), "author:\"Ada Lovelace\"");
        assert_eq!(
            author_query("Ada Lovelace", Some("engines")),
            "author:\"Ada Lovelace\" engines"
        );
        assert_eq!(author_query("Ada", Some("")), "author:\"Ada\"");
    }
}

// Common test fixtures: a small scripted Scholar site

#![allow(dead_code)]

use scholar_crawler::site::{self, profile, search, DEFAULT_BASE_URL, DEFAULT_SEARCH_URL};
use scholar_crawler::testing::{FakeAction, FakeBrowser, FakeElement, FakePage};

pub fn reference(user: &str) -> String {
    format!("/citations?user={user}&hl=en")
}

/// URL the explorer navigates to for `user` under default settings.
pub fn profile_page_url(user: &str) -> String {
    site::profile_url(DEFAULT_BASE_URL, &reference(user), true).unwrap()
}

/// Profile page for `user` linking to `co_authors`.
pub fn profile_page(user: &str, co_authors: &[&str]) -> FakePage {
    let mut page = FakePage::new()
        .with_text(profile::NAME, format!("Author {user}"))
        .with_text(profile::BRIEF, format!("University of {user}"))
        .with_text(profile::CITED_STATS, "Citations 100 h-index 5")
        .with_element(profile::ARTICLE_TITLES, FakeElement::new(format!("Paper by {user}")))
        .with_element(profile::TAGS, FakeElement::new("Physics"))
        .with_markup(format!(
            r#"<html><a class="gsc_a_at">Paper by {user}</a></html>"#
        ));
    for co in co_authors {
        page = page.with_element(
            profile::CO_AUTHORS,
            FakeElement::link(format!("Author {co}"), reference(co)),
        );
    }
    page
}

/// Browser serving a co-author graph given as `(user, "co authors")` pairs,
/// co-authors separated by spaces.
pub fn graph(edges: &[(&str, &str)]) -> FakeBrowser {
    edges.iter().fold(FakeBrowser::new(), |browser, &(user, co)| {
        let co: Vec<&str> = co.split_whitespace().collect();
        browser.with_page(profile_page_url(user), profile_page(user, &co))
    })
}

pub fn endnote(title: &str, author: &str) -> String {
    format!("%0 Journal Article\n%T {title}\n%A {author}\n%J Journal of Tests\n%D 2021\n")
}

/// Search result item with a citation export and one linked author.
pub fn result_item(url: &str, title: &str, author: &str) -> FakeElement {
    FakeElement::new(title)
        .with_child(search::RESULT_LINK, FakeElement::link(title, url))
        .with_child(
            search::RESULT_AUTHORS,
            FakeElement::link(author, reference(author)),
        )
        .with_click(
            search::CITE_BUTTON,
            FakeAction::OpenCitation(endnote(title, author)),
        )
}

pub fn results_url(author: &str, page: usize) -> String {
    format!("https://scholar.google.com/scholar?q={author}&start={}", page * 10)
}

/// Browser serving search results for each `(author, pages)` pair. Every page
/// but the last links to the next one.
pub fn search_site(authors: &[(&str, Vec<Vec<FakeElement>>)]) -> FakeBrowser {
    let mut browser = FakeBrowser::new().with_page(DEFAULT_SEARCH_URL, FakePage::new());
    for (author, pages) in authors {
        browser = browser.with_search(site::author_query(author, None), results_url(author, 0));
        for (index, items) in pages.iter().enumerate() {
            let mut page = FakePage::new().with_citation_dialog();
            for item in items {
                page = page.with_element(search::RESULT_ITEM, item.clone());
            }
            if index + 1 < pages.len() {
                page = page.with_click(
                    search::NEXT_PAGE,
                    FakeAction::Navigate(results_url(author, index + 1)),
                );
            }
            browser = browser.with_page(results_url(author, index), page);
        }
    }
    browser
}

pub fn seeds(users: &[&str]) -> Vec<String> {
    users.iter().map(|user| reference(user)).collect()
}

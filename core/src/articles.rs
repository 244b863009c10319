use crate::store::{self, DocumentStore, OrderBy, collections};
use crate::{LeagueError, LeagueResult};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const EXCERPT_LEN: usize = 150;
const MIN_QUESTION_LEN: usize = 5;
const MIN_OPTIONS: usize = 2;
const OPTION_ID_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub author: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author: String,
    pub image_url: String,
    /// Generated from the content when absent.
    pub excerpt: Option<String>,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub votes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    #[serde(default)]
    pub id: String,
    pub article_id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub total_votes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPoll {
    pub article_id: String,
    pub question: String,
    pub options: Vec<String>,
}

/// Lower-case, dash-separated, ASCII-only slug. Common Latin accents are
/// folded first; anything else outside `[a-z0-9_-]` is dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_space = false;
    for c in title.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        }
    }
    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' | 'ì' => 'i',
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => 'o',
        'û' | 'ü' | 'ú' | 'ù' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ÿ' => 'y',
        other => other,
    }
}

/// Plain-text teaser of at most `max_len` characters (plus "...") cut at a
/// word boundary. Markup tags are removed first.
pub fn generate_excerpt(content: &str, max_len: usize) -> String {
    let plain = strip_tags(content);
    if plain.chars().count() <= max_len {
        return plain;
    }
    let cut: String = plain.chars().take(max_len).collect();
    match cut.rfind(' ') {
        Some(pos) => format!("{}...", &cut[..pos]),
        None => format!("{cut}..."),
    }
}

fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) if end > 0 => rest = &after[end + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// News articles and the polls attached to them.
pub struct ArticleDesk<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ArticleDesk<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Newest first, featured articles ahead of the rest.
    pub async fn list_articles(&self) -> LeagueResult<Vec<Article>> {
        let mut articles: Vec<Article> =
            store::load_all(self.store, collections::ARTICLES, Some(&OrderBy::desc("publishedAt"))).await?;
        articles.sort_by(|a, b| b.is_featured.cmp(&a.is_featured).then(b.published_at.cmp(&a.published_at)));
        Ok(articles)
    }

    pub async fn create_article(&self, article: NewArticle) -> LeagueResult<Article> {
        let slug = slugify(&article.title);
        if slug.is_empty() {
            return Err(LeagueError::validation("article title is required"));
        }
        if self.get_article_by_slug(&slug).await?.is_some() {
            return Err(LeagueError::validation(format!("an article with slug \"{slug}\" already exists")));
        }
        let excerpt = article
            .excerpt
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| generate_excerpt(&article.content, EXCERPT_LEN));
        let mut record = Article {
            id: String::new(),
            slug,
            title: article.title,
            excerpt,
            content: article.content,
            image_url: article.image_url,
            author: article.author,
            published_at: Utc::now(),
            is_featured: article.is_featured,
            poll_id: None,
        };
        record.id = self.store.create(collections::ARTICLES, store::encode(&record)?).await?;
        info!("article \"{}\" created as {}", record.slug, record.id);
        Ok(record)
    }

    pub async fn get_article(&self, id: &str) -> LeagueResult<Option<Article>> {
        store::load_one(self.store, collections::ARTICLES, id).await
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> LeagueResult<Option<Article>> {
        let docs = self.store.find_eq(collections::ARTICLES, "slug", &json!(slug)).await?;
        docs.into_iter().next().map(store::Document::decode).transpose()
    }

    /// Delete an article together with any poll attached to it.
    pub async fn delete_article(&self, id: &str) -> LeagueResult<()> {
        let mut poll_ids: Vec<String> = self
            .store
            .find_eq(collections::POLLS, "articleId", &json!(id))
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        if let Some(poll_id) = self.get_article(id).await?.and_then(|a| a.poll_id)
            && !poll_ids.contains(&poll_id)
        {
            poll_ids.push(poll_id);
        }
        for poll_id in &poll_ids {
            debug!("deleting poll {poll_id} with article {id}");
            self.store.delete(collections::POLLS, poll_id).await?;
        }
        self.store.delete(collections::ARTICLES, id).await
    }

    // --- polls ---

    pub async fn list_polls(&self) -> LeagueResult<Vec<Poll>> {
        store::load_all(self.store, collections::POLLS, Some(&OrderBy::asc("question"))).await
    }

    pub async fn create_poll(&self, poll: NewPoll) -> LeagueResult<Poll> {
        if poll.question.trim().chars().count() < MIN_QUESTION_LEN {
            return Err(LeagueError::validation(format!(
                "poll question needs at least {MIN_QUESTION_LEN} characters"
            )));
        }
        if poll.options.len() < MIN_OPTIONS || poll.options.iter().any(|o| o.trim().is_empty()) {
            return Err(LeagueError::validation(format!(
                "a poll needs at least {MIN_OPTIONS} non-empty options"
            )));
        }
        let article = self
            .get_article(&poll.article_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("article {}", poll.article_id)))?;
        if article.poll_id.is_some() {
            return Err(LeagueError::validation(format!("article \"{}\" already has a poll", article.slug)));
        }

        let mut record = Poll {
            id: String::new(),
            article_id: poll.article_id,
            question: poll.question.trim().to_owned(),
            options: poll
                .options
                .into_iter()
                .map(|text| PollOption { id: store::new_id(OPTION_ID_LEN), text: text.trim().to_owned(), votes: 0 })
                .collect(),
            total_votes: 0,
        };
        record.id = self.store.create(collections::POLLS, store::encode(&record)?).await?;
        store::merge_existing(self.store, collections::ARTICLES, &record.article_id, json!({ "pollId": record.id }))
            .await?;
        Ok(record)
    }

    pub async fn poll_for_article(&self, article_id: &str) -> LeagueResult<Option<Poll>> {
        let docs = self.store.find_eq(collections::POLLS, "articleId", &json!(article_id)).await?;
        docs.into_iter().next().map(store::Document::decode).transpose()
    }

    /// Delete a poll and unlink it from its article.
    pub async fn delete_poll(&self, id: &str) -> LeagueResult<()> {
        let poll: Option<Poll> = store::load_one(self.store, collections::POLLS, id).await?;
        self.store.delete(collections::POLLS, id).await?;
        let Some(poll) = poll else {
            return Ok(());
        };
        if let Some(article) = self.get_article(&poll.article_id).await?
            && article.poll_id.as_deref() == Some(id)
        {
            store::merge_existing(self.store, collections::ARTICLES, &article.id, json!({ "pollId": Value::Null }))
                .await?;
        }
        Ok(())
    }

    /// Count one vote. Runs as an atomic read-modify-write on the poll.
    pub async fn vote(&self, poll_id: &str, option_id: &str) -> LeagueResult<Poll> {
        if poll_id.is_empty() || option_id.is_empty() {
            return Err(LeagueError::validation("poll and option ids are required"));
        }
        let count_vote = |current: Option<&Value>| -> LeagueResult<Value> {
            let current = current.ok_or_else(|| LeagueError::not_found(format!("poll {poll_id}")))?;
            let mut poll: Poll = serde_json::from_value(current.clone())?;
            let option = poll
                .options
                .iter_mut()
                .find(|o| o.id == option_id)
                .ok_or_else(|| LeagueError::validation(format!("poll {poll_id} has no option {option_id}")))?;
            option.votes += 1;
            poll.total_votes += 1;
            store::encode(&poll)
        };
        let written = self.store.update_with(collections::POLLS, poll_id, &count_vote).await?;
        store::Document { id: poll_id.to_owned(), data: written }.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn article(title: &str) -> NewArticle {
        NewArticle {
            title: title.into(),
            content: "<p>Le <b>Jaraaf</b> s'impose face à Gorée.</p>".into(),
            author: "Rédaction".into(),
            ..Default::default()
        }
    }

    fn poll_for(article_id: &str) -> NewPoll {
        NewPoll {
            article_id: article_id.into(),
            question: "Qui gagnera la finale ?".into(),
            options: vec!["Jaraaf".into(), "Gorée".into()],
        }
    }

    #[test]
    fn slug_folds_accents_and_dashes_spaces() {
        assert_eq!(slugify("Finale  de la Coupe du Maire"), "finale-de-la-coupe-du-maire");
        assert_eq!(slugify("Navétane 2025: l'été!"), "navetane-2025-lete");
        assert_eq!(slugify("   "), "");
    }

    #[test]
    fn excerpt_strips_tags_and_cuts_on_word_boundary() {
        assert_eq!(generate_excerpt("<p>Court</p>", 150), "Court");
        assert_eq!(generate_excerpt("un deux trois quatre", 10), "un deux...");
        assert_eq!(generate_excerpt("abcdefghijkl", 5), "abcde...");
        assert_eq!(generate_excerpt("a < b et c > d", 150), "a  d");
        assert_eq!(generate_excerpt("", 150), "");
    }

    #[test]
    fn lone_angle_brackets_survive() {
        assert_eq!(strip_tags("3 < 4"), "3 < 4");
        assert_eq!(strip_tags("<>x"), "<>x");
    }

    #[tokio::test]
    async fn article_gets_slug_and_excerpt() {
        let store = MemoryStore::new();
        let desk = ArticleDesk::new(&store);
        let created = desk.create_article(article("Le Jaraaf en finale")).await.unwrap();
        assert_eq!(created.slug, "le-jaraaf-en-finale");
        assert_eq!(created.excerpt, "Le Jaraaf s'impose face à Gorée.");

        let found = desk.get_article_by_slug("le-jaraaf-en-finale").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(desk.get_article_by_slug("absent").await.unwrap().is_none());

        let dup = desk.create_article(article("Le Jaraaf en finale")).await.unwrap_err();
        assert!(dup.is_validation());
    }

    #[tokio::test]
    async fn poll_validation() {
        let store = MemoryStore::new();
        let desk = ArticleDesk::new(&store);
        let a = desk.create_article(article("Sondage")).await.unwrap();

        let short = NewPoll { question: "Qui".into(), ..poll_for(&a.id) };
        assert!(desk.create_poll(short).await.unwrap_err().is_validation());
        let one = NewPoll { options: vec!["Jaraaf".into()], ..poll_for(&a.id) };
        assert!(desk.create_poll(one).await.unwrap_err().is_validation());
        let blank = NewPoll { options: vec!["Jaraaf".into(), " ".into()], ..poll_for(&a.id) };
        assert!(desk.create_poll(blank).await.unwrap_err().is_validation());
        assert!(desk.create_poll(poll_for("missing")).await.unwrap_err().is_not_found());
        assert_eq!(store.count(collections::POLLS).await, 0);
    }

    #[tokio::test]
    async fn deleting_article_deletes_its_poll() {
        let store = MemoryStore::new();
        let desk = ArticleDesk::new(&store);
        let a = desk.create_article(article("Demi-finale")).await.unwrap();
        let poll = desk.create_poll(poll_for(&a.id)).await.unwrap();
        assert_eq!(desk.get_article(&a.id).await.unwrap().unwrap().poll_id, Some(poll.id.clone()));
        assert_eq!(desk.poll_for_article(&a.id).await.unwrap().unwrap().id, poll.id);

        desk.delete_article(&a.id).await.unwrap();
        assert!(desk.get_article(&a.id).await.unwrap().is_none());
        assert_eq!(store.count(collections::POLLS).await, 0);
    }

    #[tokio::test]
    async fn deleting_poll_unlinks_article() {
        let store = MemoryStore::new();
        let desk = ArticleDesk::new(&store);
        let a = desk.create_article(article("Quart de finale")).await.unwrap();
        let poll = desk.create_poll(poll_for(&a.id)).await.unwrap();

        desk.delete_poll(&poll.id).await.unwrap();
        assert!(desk.get_article(&a.id).await.unwrap().unwrap().poll_id.is_none());
        assert!(desk.poll_for_article(&a.id).await.unwrap().is_none());
        desk.create_poll(poll_for(&a.id)).await.unwrap();
    }

    #[tokio::test]
    async fn votes_are_counted() {
        let store = MemoryStore::new();
        let desk = ArticleDesk::new(&store);
        let a = desk.create_article(article("Finale")).await.unwrap();
        let poll = desk.create_poll(poll_for(&a.id)).await.unwrap();
        let goree = poll.options[1].id.clone();

        desk.vote(&poll.id, &goree).await.unwrap();
        let after = desk.vote(&poll.id, &goree).await.unwrap();
        assert_eq!(after.total_votes, 2);
        assert_eq!(after.options[1].votes, 2);
        assert_eq!(after.options[0].votes, 0);

        assert!(desk.vote(&poll.id, "nope").await.unwrap_err().is_validation());
        assert!(desk.vote("missing", &goree).await.unwrap_err().is_not_found());
        assert_eq!(desk.poll_for_article(&a.id).await.unwrap().unwrap().total_votes, 2);
    }
}

//! RSS 2.0 feed of the latest public posts.

use crate::blog::Blog;
use crate::error::BlogResult;
use crate::i18n::Language;
use crate::media::{ImageArchive, FEED_RENDITION};
use crate::models::Post;
use crate::store::PostQuery;
use crate::templates::POST_DESCRIPTION;
use crate::urls;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rss::{Channel, Enclosure, Guid, Item};
use tera::Context;
use tracing::{info, warn};

pub const ENCLOSURE_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub title: String,
    pub description: String,
    /// Site-relative link of the channel
    pub link: String,
    pub items_to_display: usize,
}

pub struct PostFeed<'a> {
    blog: &'a Blog,
    archive: &'a ImageArchive,
    settings: &'a FeedSettings,
}

impl<'a> PostFeed<'a> {
    pub fn new(blog: &'a Blog, archive: &'a ImageArchive, settings: &'a FeedSettings) -> Self {
        Self {
            blog,
            archive,
            settings,
        }
    }

    /// Published, released default-language posts, newest first.
    pub async fn select_items(&self, now: DateTime<Utc>) -> BlogResult<Vec<Post>> {
        let query =
            PostQuery::public(Language::canonical(), now).with_limit(self.settings.items_to_display);
        self.blog.list_posts(&query).await
    }

    fn describe(&self, post: &Post) -> BlogResult<String> {
        let mut context = Context::new();
        context.insert("post", post);
        Ok(self.blog.templates().render(POST_DESCRIPTION, &context)?)
    }

    async fn enclosure(&self, banner: &str) -> Enclosure {
        let length = match self.archive.size(banner, FEED_RENDITION).await {
            Ok(size) => size,
            Err(e) => {
                warn!(banner, error = %e, "Could not determine enclosure size");
                0
            }
        };

        let mut enclosure = Enclosure::default();
        enclosure.set_url(self.archive.url(banner, FEED_RENDITION));
        enclosure.set_length(length.to_string());
        enclosure.set_mime_type(ENCLOSURE_MIME_TYPE);
        enclosure
    }

    async fn item(&self, post: &Post) -> BlogResult<Item> {
        let domain = &self.blog.settings().site_domain;
        let link = post.absolute_url(domain);

        let mut guid = Guid::default();
        guid.set_value(link.clone());
        guid.set_permalink(true);

        let mut item = Item::default();
        item.set_title(post.content.title.clone());
        item.set_link(link);
        item.set_guid(guid);
        item.set_description(self.describe(post)?);
        if let Some(date) = post.release_date {
            item.set_pub_date(date.to_rfc2822());
        }
        if let Some(banner) = post.banner.as_deref() {
            item.set_enclosure(self.enclosure(banner).await);
        }
        Ok(item)
    }

    pub async fn channel(&self, now: DateTime<Utc>) -> BlogResult<Channel> {
        let posts = self.select_items(now).await?;
        let items = join_all(posts.iter().map(|post| self.item(post)))
            .await
            .into_iter()
            .collect::<BlogResult<Vec<_>>>()?;

        let mut channel = Channel::default();
        channel.set_title(self.settings.title.clone());
        channel.set_link(urls::absolute_url(
            &self.blog.settings().site_domain,
            &self.settings.link,
        ));
        channel.set_description(self.settings.description.clone());
        channel.set_language(Language::canonical().code().to_string());
        if let Some(latest) = posts.first().and_then(|p| p.release_date) {
            channel.set_last_build_date(latest.to_rfc2822());
        }
        channel.set_items(items);

        info!(items = channel.items().len(), "Built blog feed");
        Ok(channel)
    }

    pub async fn render(&self, now: DateTime<Utc>) -> BlogResult<String> {
        Ok(self.channel(now).await?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::BlogSettings;
    use crate::models::{CategoryInput, Localized, PostContent, PostInput};
    use crate::store::MemoryStore;
    use crate::templates::TemplateEngine;
    use chrono::Duration;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn blog_with_posts(posts: &[(&str, i64, bool)]) -> Blog {
        let store = Arc::new(MemoryStore::new());
        let blog = Blog::new(
            store,
            TemplateEngine::new(None).unwrap(),
            BlogSettings {
                site_domain: "www.example.org".to_string(),
                i18n_enabled: true,
            },
        );
        let category = blog
            .create_category(CategoryInput {
                name: Localized::new("News"),
                slug: Localized::new("news"),
                footer: Localized::default(),
            })
            .await
            .unwrap();

        let now = Utc::now();
        for (slug, days_ago, published) in posts {
            blog.create_post(PostInput {
                slug: slug.to_string(),
                content: PostContent {
                    title: slug.to_uppercase(),
                    subtitle: "Sub".to_string(),
                    lede: format!("Lede of {}", slug),
                    body: "Body".to_string(),
                    ..Default::default()
                },
                banner: Some(format!("{}-banner", slug)),
                category_id: Some(category.id),
                release_date: Some(now - Duration::days(*days_ago)),
                published: *published,
                ..Default::default()
            })
            .await
            .unwrap();
        }
        blog
    }

    fn settings(items: usize) -> FeedSettings {
        FeedSettings {
            title: "Blog".to_string(),
            description: "News".to_string(),
            link: "/public/blog/".to_string(),
            items_to_display: items,
        }
    }

    #[tokio::test]
    async fn test_items_ordered_and_filtered() {
        let blog = blog_with_posts(&[
            ("d3", 3, true),
            ("d1", 1, true),
            ("hidden", 0, false),
            ("future", -2, true),
            ("d2", 2, true),
        ])
        .await;
        let archive = ImageArchive::new("https://media.example.org").unwrap();
        let settings = settings(10);
        let feed = PostFeed::new(&blog, &archive, &settings);

        let items = feed.select_items(Utc::now()).await.unwrap();
        let slugs: Vec<_> = items.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["d1", "d2", "d3"]);
    }

    #[tokio::test]
    async fn test_items_limited() {
        let blog = blog_with_posts(&[("a", 1, true), ("b", 2, true), ("c", 3, true)]).await;
        let archive = ImageArchive::new("https://media.example.org").unwrap();
        let settings = settings(2);
        let feed = PostFeed::new(&blog, &archive, &settings);

        assert_eq!(feed.select_items(Utc::now()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rendered_feed_has_enclosures() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1234]))
            .mount(&server)
            .await;

        let blog = blog_with_posts(&[("d2", 2, true), ("d1", 1, true)]).await;
        let archive = ImageArchive::new(&server.uri()).unwrap();
        let settings = settings(10);
        let feed = PostFeed::new(&blog, &archive, &settings);

        let xml = feed.render(Utc::now()).await.unwrap();
        let channel = Channel::read_from(xml.as_bytes()).unwrap();

        assert_eq!(channel.title(), "Blog");
        assert_eq!(channel.link(), "https://www.example.org/public/blog/");
        assert_eq!(channel.items().len(), 2);

        let first = &channel.items()[0];
        assert_eq!(first.title(), Some("D1"));
        assert_eq!(first.link(), Some("https://www.example.org/public/blog/d1/"));
        assert!(first.description().unwrap().contains("Lede of d1"));

        let enclosure = first.enclosure().unwrap();
        assert_eq!(enclosure.mime_type(), ENCLOSURE_MIME_TYPE);
        assert_eq!(enclosure.length(), "1234");
        assert!(enclosure.url().ends_with("/archives/images/screen/d1-banner.jpg"));
    }

    #[tokio::test]
    async fn test_enclosure_size_failure_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let blog = blog_with_posts(&[("d1", 1, true)]).await;
        let archive = ImageArchive::new(&server.uri()).unwrap();
        let settings = settings(10);
        let feed = PostFeed::new(&blog, &archive, &settings);

        let channel = feed.channel(Utc::now()).await.unwrap();
        assert_eq!(channel.items()[0].enclosure().unwrap().length(), "0");
    }
}

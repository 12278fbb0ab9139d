//! Repository interfaces over the account and content collections, plus the
//! bundled in-memory implementation.
//!
//! Business logic only talks to [`AccountRepository`] and
//! [`ContentRepository`]; swapping in a database-backed store means
//! implementing those two traits.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::types::{
    Account, Collection, Comment, CommentStatus, NewAccount, NewComment, NewOAuthLink, NewPost,
    OAuthLink, Post,
};

/// Read/write access to the `admins`, `users` and `oauth-accounts`
/// collections.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// First account in `collection` whose email equals `email` exactly.
    async fn find_by_email(
        &self,
        collection: Collection,
        email: &str,
    ) -> Result<Option<Account>, ServiceError>;

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Account>, ServiceError>;

    /// OAuth links pointing at `user_id` inside `collection`.
    async fn find_oauth_links(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<OAuthLink>, ServiceError>;

    async fn count_accounts(&self, collection: Collection) -> Result<usize, ServiceError>;

    /// Inserts an account. Fails with `Conflict` if the email is taken in
    /// that collection.
    async fn create_account(
        &self,
        collection: Collection,
        account: NewAccount,
    ) -> Result<Account, ServiceError>;

    /// Inserts an admin only while the `admins` collection is empty. Fails
    /// with `Forbidden` once any admin exists. The emptiness check and the
    /// insert must be a single atomic step.
    async fn create_first_admin(&self, account: NewAccount) -> Result<Account, ServiceError>;

    /// Inserts an OAuth link. Fails with `Conflict` if the provider identity
    /// is already linked.
    async fn create_oauth_link(&self, link: NewOAuthLink) -> Result<OAuthLink, ServiceError>;
}

/// Read/write access to posts and their comments.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn find_post(&self, id: &str) -> Result<Option<Post>, ServiceError>;

    async fn create_post(&self, post: NewPost) -> Result<Post, ServiceError>;

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, ServiceError>;

    async fn comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, ServiceError>;
}

/// In-memory store for every collection. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    admins: RwLock<Vec<Account>>,
    users: RwLock<Vec<Account>>,
    oauth_links: RwLock<Vec<OAuthLink>>,
    posts: RwLock<Vec<Post>>,
    comments: RwLock<Vec<Comment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self, collection: Collection) -> &RwLock<Vec<Account>> {
        match collection {
            Collection::Admins => &self.admins,
            Collection::Users => &self.users,
        }
    }
}

fn insert_account(
    accounts: &mut Vec<Account>,
    account: NewAccount,
) -> Result<Account, ServiceError> {
    if accounts.iter().any(|a| a.email == account.email) {
        return Err(ServiceError::Conflict(
            "An account with this email already exists".to_owned(),
        ));
    }
    let created = Account {
        id: Uuid::new_v4().to_string(),
        name: account.name,
        email: account.email,
        password_hash: account.password_hash,
        created_at: Utc::now(),
    };
    accounts.push(created.clone());
    Ok(created)
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn find_by_email(
        &self,
        collection: Collection,
        email: &str,
    ) -> Result<Option<Account>, ServiceError> {
        Ok(self
            .accounts(collection)
            .read()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Account>, ServiceError> {
        Ok(self
            .accounts(collection)
            .read()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_oauth_links(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<OAuthLink>, ServiceError> {
        Ok(self
            .oauth_links
            .read()
            .iter()
            .filter(|l| l.user_id == user_id && l.target_collection == collection)
            .cloned()
            .collect())
    }

    async fn count_accounts(&self, collection: Collection) -> Result<usize, ServiceError> {
        Ok(self.accounts(collection).read().len())
    }

    async fn create_account(
        &self,
        collection: Collection,
        account: NewAccount,
    ) -> Result<Account, ServiceError> {
        insert_account(&mut self.accounts(collection).write(), account)
    }

    async fn create_first_admin(&self, account: NewAccount) -> Result<Account, ServiceError> {
        let mut admins = self.admins.write();
        if !admins.is_empty() {
            return Err(ServiceError::Forbidden(
                "Only admins can create admin accounts".to_owned(),
            ));
        }
        insert_account(&mut admins, account)
    }

    async fn create_oauth_link(&self, link: NewOAuthLink) -> Result<OAuthLink, ServiceError> {
        let mut links = self.oauth_links.write();
        if links.iter().any(|l| {
            l.provider == link.provider && l.provider_account_id == link.provider_account_id
        }) {
            return Err(ServiceError::Conflict(format!(
                "This {} account is already linked",
                link.provider
            )));
        }
        let created = OAuthLink {
            id: Uuid::new_v4().to_string(),
            user_id: link.user_id,
            target_collection: link.target_collection,
            provider: link.provider,
            provider_account_id: link.provider_account_id,
            created_at: Utc::now(),
        };
        links.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn find_post(&self, id: &str) -> Result<Option<Post>, ServiceError> {
        Ok(self.posts.read().iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, ServiceError> {
        let mut posts = self.posts.write();
        if posts.iter().any(|p| p.slug == post.slug) {
            return Err(ServiceError::Conflict(format!(
                "post '{}' already exists",
                post.slug
            )));
        }
        if let Some(id) = &post.id
            && posts.iter().any(|p| &p.id == id)
        {
            return Err(ServiceError::Conflict(format!("post id '{id}' already exists")));
        }
        let created = Post {
            id: post.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            slug: post.slug,
            title: post.title,
            published: post.published,
        };
        posts.push(created.clone());
        Ok(created)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, ServiceError> {
        let created = Comment {
            id: Uuid::new_v4().to_string(),
            post_id: comment.post_id,
            author_name: comment.author_name,
            author_email: comment.author_email,
            content: comment.content,
            status: CommentStatus::Pending,
            ip: comment.ip,
            created_at: Utc::now(),
        };
        self.comments.write().push(created.clone());
        Ok(created)
    }

    async fn comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, ServiceError> {
        Ok(self
            .comments
            .read()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "Ada".to_owned(),
            email: email.to_owned(),
            password_hash: None,
        }
    }

    #[tokio::test]
    async fn test_accounts_are_scoped_per_collection() {
        let store = MemoryStore::new();
        let admin = store
            .create_account(Collection::Admins, new_account("ada@example.com"))
            .await
            .unwrap();

        let found = store
            .find_by_email(Collection::Admins, "ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, admin.id);
        assert!(store
            .find_by_email(Collection::Users, "ada@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_id(Collection::Admins, &admin.id)
            .await
            .unwrap()
            .is_some());
        assert_eq!(store.count_accounts(Collection::Admins).await.unwrap(), 1);
        assert_eq!(store.count_accounts(Collection::Users).await.unwrap(), 0);

        // Same email is fine in the other collection.
        store
            .create_account(Collection::Users, new_account("ada@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .create_account(Collection::Users, new_account("ada@example.com"))
            .await
            .unwrap();
        let err = store
            .create_account(Collection::Users, new_account("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_oauth_links_filter_by_collection() {
        let store = MemoryStore::new();
        store
            .create_oauth_link(NewOAuthLink {
                user_id: "u1".to_owned(),
                target_collection: Collection::Users,
                provider: "github".to_owned(),
                provider_account_id: "42".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(
            store
                .find_oauth_links("u1", Collection::Users)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(store
            .find_oauth_links("u1", Collection::Admins)
            .await
            .unwrap()
            .is_empty());

        let err = store
            .create_oauth_link(NewOAuthLink {
                user_id: "u2".to_owned(),
                target_collection: Collection::Admins,
                provider: "github".to_owned(),
                provider_account_id: "42".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_comments_start_pending() {
        let store = MemoryStore::new();
        let post = store
            .create_post(NewPost {
                id: Some("p1".to_owned()),
                slug: "hello".to_owned(),
                title: "Hello".to_owned(),
                published: true,
            })
            .await
            .unwrap();
        assert_eq!(post.id, "p1");

        let comment = store
            .create_comment(NewComment {
                post_id: post.id.clone(),
                author_name: "Ada".to_owned(),
                author_email: "ada@example.com".to_owned(),
                content: "Nice post".to_owned(),
                ip: "10.0.0.1".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(comment.status, CommentStatus::Pending);
        assert_eq!(store.comments_for_post("p1").await.unwrap().len(), 1);
        assert!(store.comments_for_post("p2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_post_id_conflicts() {
        let store = MemoryStore::new();
        store
            .create_post(NewPost {
                id: Some("p1".to_owned()),
                slug: "hello".to_owned(),
                title: "Hello".to_owned(),
                published: true,
            })
            .await
            .unwrap();

        let err = store
            .create_post(NewPost {
                id: Some("p1".to_owned()),
                slug: "another".to_owned(),
                title: "Another".to_owned(),
                published: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // The original post is untouched.
        let post = store.find_post("p1").await.unwrap().unwrap();
        assert_eq!(post.slug, "hello");
        assert!(post.published);
    }

    #[tokio::test]
    async fn test_first_admin_only_while_empty() {
        let store = MemoryStore::new();
        store
            .create_first_admin(new_account("root@example.com"))
            .await
            .unwrap();
        let err = store
            .create_first_admin(new_account("second@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(store.count_accounts(Collection::Admins).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_admin_inserts_once() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create_first_admin(new_account(&format!("admin{i}@example.com")))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, ServiceError::Forbidden(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.count_accounts(Collection::Admins).await.unwrap(), 1);
    }
}

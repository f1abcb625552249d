use village_types::models::{PostId, PostKind, UserId};

use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::resources::PostStore;

/// `mailto:` link to a post's author, for anyone but the author.
pub fn mailto_for_post(
    posts: &PostStore,
    credentials: &CredentialStore,
    post_id: PostId,
    caller: UserId,
) -> Result<String> {
    let post = posts.get(post_id)?;
    if post.kind == PostKind::Announcement {
        return Err(Error::InvalidInput(
            "contact not available for announcements".into(),
        ));
    }
    if post.user_id == caller {
        return Err(Error::InvalidInput("cannot contact yourself".into()));
    }

    let author = credentials.get_by_id(post.user_id)?;
    let subject = format!("Village Square: {}", post.title);
    Ok(format!(
        "mailto:{}?subject={}",
        author.email,
        urlencoding::encode(&subject)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, offer};

    #[test]
    fn link_targets_author_with_encoded_subject() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");
        let bob = testing::user(&state, "bob@x.test");
        let post = state.posts.create(alice, &offer("Fresh bread & jam")).unwrap();

        let link = mailto_for_post(&state.posts, &state.credentials, post.id, bob).unwrap();
        assert_eq!(
            link,
            "mailto:alice@x.test?subject=Village%20Square%3A%20Fresh%20bread%20%26%20jam"
        );
    }

    #[test]
    fn author_cannot_contact_self() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");
        let post = state.posts.create(alice, &offer("bread")).unwrap();

        let err = mailto_for_post(&state.posts, &state.credentials, post.id, alice).unwrap_err();
        assert_eq!(err.to_string(), "cannot contact yourself");
    }

    #[test]
    fn announcements_have_no_contact() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");
        let bob = testing::user(&state, "bob@x.test");
        let mut notice = offer("council meeting");
        notice.kind = PostKind::Announcement;
        let post = state.posts.create(alice, &notice).unwrap();

        let err = mailto_for_post(&state.posts, &state.credentials, post.id, bob).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}

use super::*;

#[test]
fn user_parses_numeric_or_string_id() {
    let user: User = serde_json::from_str(r#"{"id":1,"username":"alice","email":"a@x.com"}"#).unwrap();
    assert_eq!(user, User { id: 1, username: "alice".into(), email: "a@x.com".into() });

    let user: User = serde_json::from_str(r#"{"id":"7","username":"bob","email":"b@x.com"}"#).unwrap();
    assert_eq!(user.id, 7);

    assert!(serde_json::from_str::<User>(r#"{"id":"seven","username":"bob","email":"b@x.com"}"#).is_err());
}

#[test]
fn blog_accepts_mixed_id_shapes_and_missing_optionals() {
    let blog: Blog = serde_json::from_str(
        r#"{"id":3,"blog_name":"Notes","description":"d","main_image_url":null,"user_id":12,"default_category_id":"4"}"#,
    )
    .unwrap();
    assert_eq!(blog.user_id.as_deref(), Some("12"));
    assert_eq!(blog.default_category_id.as_deref(), Some("4"));
    assert_eq!(blog.main_image_url, None);

    let blog: Blog = serde_json::from_str(r#"{"id":"3","blog_name":"Notes"}"#).unwrap();
    assert_eq!(blog.id, 3);
    assert_eq!(blog.description, "");
    assert_eq!(blog.user_id, None);
}

#[test]
fn post_fills_defaults_and_reports_protection() {
    let post: Post = serde_json::from_str(
        r#"{"id":10,"title":"Two pointers","content":"$O(n)$","protected":1,"problem_numbers":[1000,1001],"blog_id":"3","category_id":null}"#,
    )
    .unwrap();
    assert!(post.is_protected());
    assert_eq!(post.problem_numbers, vec![1000, 1001]);
    assert_eq!(post.blog_id, Some(3));
    assert_eq!(post.category_id, None);
    assert_eq!(post.article_likes, 0);
}

#[test]
fn post_page_counts_pages() {
    let page: PostPage =
        serde_json::from_str(r#"{"page":2,"per_page":10,"total_count":25,"articles":[]}"#).unwrap();
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next());

    let last = PostPage { page: 3, ..page.clone() };
    assert!(!last.has_next());

    let degenerate = PostPage { per_page: 0, ..page };
    assert_eq!(degenerate.total_pages(), 0);
}

#[test]
fn like_status_accepts_bool_or_object() {
    let flag: LikeStatus = serde_json::from_str("true").unwrap();
    assert!(flag.liked());
    let object: LikeStatus = serde_json::from_str(r#"{"liked":false}"#).unwrap();
    assert!(!object.liked());
}

#[test]
fn updates_skip_unset_fields() {
    let body = serde_json::to_value(BlogUpdate { name: Some("New".into()), description: None }).unwrap();
    assert_eq!(body, serde_json::json!({ "name": "New" }));
    assert!(BlogUpdate::default().is_empty());
    assert!(PostUpdate::default().is_empty());
    assert!(!PostUpdate { secret: Some(false), ..PostUpdate::default() }.is_empty());
    assert!(BlogSettings::default().is_empty());
}

#[test]
fn new_post_sends_flags_as_numbers() {
    let post = NewPost {
        description: "sliding window".into(),
        secret: true,
        comments_enabled: false,
        problem_numbers: vec![1000, 1920],
        ..NewPost::new("Two pointers", "# body", "4")
    };
    let body = serde_json::to_value(&post).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "title": "Two pointers",
            "content": "# body",
            "description": "sliding window",
            "category_id": "4",
            "secret": 1,
            "protected": 0,
            "comments_enabled": 0,
            "problem_numbers": [1000, 1920],
        })
    );
}

#[test]
fn post_update_encodes_only_set_flags() {
    let update = PostUpdate {
        comments_enabled: Some(true),
        problem_numbers: Some(Vec::new()),
        ..PostUpdate::default()
    };
    let body = serde_json::to_value(&update).unwrap();
    assert_eq!(body, serde_json::json!({ "comments_enabled": 1, "problem_numbers": [] }));
}

#[test]
fn blog_settings_use_server_key_spelling() {
    let settings = BlogSettings { blog_name: Some("Notes".into()), main_image_url: Some("https://img/x.png".into()) };
    let body = serde_json::to_value(&settings).unwrap();
    assert_eq!(body, serde_json::json!({ "blog_name": "Notes", "main_image_URL": "https://img/x.png" }));
}

#[test]
fn problem_numbers_skip_blanks_and_garbage() {
    assert_eq!(parse_problem_numbers("1000, 1920,, x ,42"), vec![1000, 1920, 42]);
    assert!(parse_problem_numbers("").is_empty());
}

#[test]
fn post_query_page_computes_skip() {
    assert_eq!(PostQuery::page(1, 10).skip, Some(0));
    assert_eq!(PostQuery::page(3, 10).skip, Some(20));
    assert_eq!(PostQuery::page(0, 10).skip, Some(0));
}

#[test]
fn post_query_only_encodes_set_fields() {
    assert!(PostQuery::default().to_pairs().is_empty());

    let query = PostQuery {
        search: Some(String::new()),
        sort_by: Some("created_at".into()),
        order: Some(SortOrder::Desc),
        ..PostQuery::page(2, 10)
    };
    assert_eq!(
        query.to_pairs(),
        vec![
            ("skip".to_owned(), "10".to_owned()),
            ("limit".to_owned(), "10".to_owned()),
            ("sort_by".to_owned(), "created_at".to_owned()),
            ("order".to_owned(), "desc".to_owned()),
        ]
    );
}

#[test]
fn sort_order_parses_case_insensitively() {
    assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
    assert!("sideways".parse::<SortOrder>().is_err());
}

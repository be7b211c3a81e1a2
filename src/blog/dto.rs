use serde::{Deserialize, Serialize};

use super::repo_types::BlogPost;
use crate::catalog::repo_types::CourseCategory;

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub image: Option<String>,
    pub video: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub latest_posts: Vec<BlogPost>,
    pub categories: Vec<CourseCategory>,
}

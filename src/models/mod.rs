pub mod comment;
pub mod message;
pub mod post;
pub mod recommendation;
pub mod stats;
pub mod user;

pub use comment::{Comment, CreateCommentRequest};
pub use message::{Message, SendMessageRequest, UnreadCount};
pub use post::{
    Category, CategoryCount, CreateCategoryRequest, CreatePostRequest, Post, PostDetail,
    PostListQuery, PostPage, PostStatus, PostSummary, ReactionSummary, TagCount,
    UpdatePostRequest,
};
pub use recommendation::{
    CandidateQuery, PreferenceSignals, Relevance, SignalSet, SignalSource, SuggestedPost,
    SuggestionRow, MAX_SUGGESTIONS,
};
pub use stats::{AdminStats, CategoryShare, DailyCount, TopPost, Totals};
pub use user::{LoginRequest, RegisterRequest, Role, User, UserProfile, UserSummary};

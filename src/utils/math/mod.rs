pub mod vector;

pub use vector::{cosine_similarity, dot, l2_norm, l2_normalize, SparseVec};

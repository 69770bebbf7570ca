mod sort_pairs;

pub use sort_pairs::SortPairs;

pub mod elastic;

pub use elastic::ElasticIndex;

pub mod dataset;

pub use self::dataset::{load_cocktails, CocktailRecord};

//! Read-only word/category catalog consumed by round creation.
//!
//! The engine never writes words; it only needs "all categories having at
//! least one word" when a game starts and a word lookup when building
//! snapshots. Real deployments can back this trait with whatever store
//! holds their seed data.

use async_trait::async_trait;

use crate::types::{Category, Word, WordId};

/// A word resolved together with the name of its category.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub word: Word,
    pub category: String,
}

#[async_trait]
pub trait WordCatalog: Send + Sync {
    /// All categories known to the catalog, words included. Categories
    /// without words are allowed here; round creation filters them out.
    async fn categories(&self) -> Vec<Category>;

    /// Resolve a word id back to the word and its category name.
    async fn lookup(&self, word_id: &WordId) -> Option<CatalogEntry>;
}

/// In-memory catalog backed by a fixed category list.
pub struct StaticCatalog {
    categories: Vec<Category>,
}

impl StaticCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Build a catalog from (category name, words) pairs, minting ids.
    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        let categories = pairs
            .iter()
            .map(|(name, words)| Category {
                id: ulid::Ulid::new().to_string(),
                name: name.to_string(),
                words: words
                    .iter()
                    .map(|text| Word {
                        id: ulid::Ulid::new().to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
            })
            .collect();
        Self::new(categories)
    }

    /// Catalog preloaded with the stock Spanish seed data.
    pub fn with_seed() -> Self {
        Self::from_pairs(&[
            (
                "Animales",
                &[
                    "Perro", "Gato", "Elefante", "León", "Delfín", "Águila", "Tigre", "Oso",
                    "Lobo", "Jirafa", "Conejo", "Caballo", "Pájaro", "Serpiente", "Ballena",
                ],
            ),
            (
                "Países",
                &[
                    "México", "España", "Francia", "Japón", "Brasil", "Italia", "Alemania",
                    "Argentina", "Canadá", "Australia", "India", "China", "Rusia", "Portugal",
                    "Colombia",
                ],
            ),
            (
                "Comidas",
                &[
                    "Pizza", "Sushi", "Tacos", "Hamburguesa", "Pasta", "Ensalada", "Helado",
                    "Paella", "Ceviche", "Croissant", "Tamal", "Empanada", "Ramen", "Curry",
                    "Tostada",
                ],
            ),
            (
                "Profesiones",
                &[
                    "Doctor", "Bombero", "Maestro", "Piloto", "Chef", "Arquitecto", "Ingeniero",
                    "Abogado", "Policía", "Astronauta", "Artista", "Músico", "Periodista",
                    "Veterinario", "Fotógrafo",
                ],
            ),
        ])
    }
}

#[async_trait]
impl WordCatalog for StaticCatalog {
    async fn categories(&self) -> Vec<Category> {
        self.categories.clone()
    }

    async fn lookup(&self, word_id: &WordId) -> Option<CatalogEntry> {
        for category in &self.categories {
            if let Some(word) = category.words.iter().find(|w| w.id == *word_id) {
                return Some(CatalogEntry {
                    word: word.clone(),
                    category: category.name.clone(),
                });
            }
        }
        None
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod fake;

pub use fake::{FakeCatalog, ServiceCall};

use catalog_app::{
    Brand, BrandId, Category, CategoryId, Notice, NoticeLevel, Notifier, Product, ProductId,
    Rating, RatingId,
};
use time::{Date, Duration, Month, OffsetDateTime, Time};

const REFERENCE_YEAR: i32 = 2026;

const CATEGORIES: [&str; 8] = [
    "Lighting",
    "Furniture",
    "Kitchen",
    "Audio",
    "Outdoor",
    "Stationery",
    "Bath",
    "Decor",
];

const BRANDS: [&str; 6] = ["Lumen", "Oakhart", "Nordvik", "Sonora", "Pellucid", "Marlow"];

const ADJECTIVES: [&str; 14] = [
    "Classic", "Compact", "Deluxe", "Ergonomic", "Foldable", "Handmade", "Minimal", "Modular",
    "Portable", "Rustic", "Sleek", "Smart", "Vintage", "Wireless",
];

const NOUNS: [(&str, &str); 16] = [
    ("Lighting", "Desk Lamp"),
    ("Lighting", "Pendant Light"),
    ("Furniture", "Armchair"),
    ("Furniture", "Bookshelf"),
    ("Kitchen", "Chef Knife"),
    ("Kitchen", "Kettle"),
    ("Audio", "Speaker"),
    ("Audio", "Headphones"),
    ("Outdoor", "Lantern"),
    ("Outdoor", "Hammock"),
    ("Stationery", "Notebook"),
    ("Stationery", "Fountain Pen"),
    ("Bath", "Towel Set"),
    ("Bath", "Soap Dish"),
    ("Decor", "Vase"),
    ("Decor", "Wall Clock"),
];

const REVIEWERS: [&str; 10] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Quinn", "Parker", "Rowan", "Kai",
];

const REVIEW_PHRASES: [&str; 10] = [
    "Exactly as described.",
    "Great value for the price.",
    "Arrived quickly and well packed.",
    "Build quality could be better.",
    "Would buy again.",
    "Looks even better in person.",
    "Stopped working after a month.",
    "Solid, no complaints.",
    "A bit smaller than expected.",
    "My favorite purchase this year.",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for believable catalog data.
#[derive(Debug, Clone)]
pub struct CatalogFaker {
    rng: DeterministicRng,
    next_product: u64,
    next_rating: u64,
}

impl CatalogFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_product: 0,
            next_rating: 0,
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        CATEGORIES
            .iter()
            .enumerate()
            .map(|(index, name)| sample_category(&format!("c-{}", index + 1), name))
            .collect()
    }

    pub fn brands(&self) -> Vec<Brand> {
        BRANDS
            .iter()
            .enumerate()
            .map(|(index, name)| sample_brand(&format!("b-{}", index + 1), name))
            .collect()
    }

    pub fn product(&mut self) -> Product {
        self.next_product += 1;
        let (category_name, noun) = NOUNS[self.rng.int_n(NOUNS.len())];
        let name = format!("{} {}", self.pick(&ADJECTIVES), noun);
        let category_index = CATEGORIES
            .iter()
            .position(|candidate| *candidate == category_name)
            .unwrap_or(0);
        let brand = if self.rng.int_n(4) == 0 {
            None
        } else {
            let index = self.rng.int_n(BRANDS.len());
            Some(sample_brand(&format!("b-{}", index + 1), BRANDS[index]))
        };
        let created_at = self.datetime_in_year(REFERENCE_YEAR - 1);
        let updated_at = created_at + Duration::days(self.rng.int_n(90) as i64);
        let price = (self.rng.int_n(49_900) as f64 + 100.0) / 100.0;

        Product {
            id: ProductId::new(format!("demo-{}", self.next_product)),
            slug: slugify(&name),
            description: format!("{name} from the {category_name} range."),
            image_url: format!(
                "https://images.example.com/products/{}.jpg",
                slugify(&name)
            ),
            name,
            price,
            is_featured: self.rng.int_n(5) == 0,
            category: sample_category(&format!("c-{}", category_index + 1), category_name),
            brand,
            created_at,
            updated_at,
            deleted_at: None,
        }
    }

    pub fn ratings(&mut self, count: usize) -> Vec<Rating> {
        (0..count)
            .map(|_| {
                self.next_rating += 1;
                let score = if self.rng.bool() {
                    4 + self.rng.int_n(2)
                } else {
                    1 + self.rng.int_n(5)
                };
                Rating {
                    id: RatingId::new(format!("r-{}", self.next_rating)),
                    rating: score as u8,
                    comment: self.pick(&REVIEW_PHRASES).to_owned(),
                    user_name: self.pick(&REVIEWERS).to_owned(),
                    created_at: self.datetime_in_year(REFERENCE_YEAR),
                }
            })
            .collect()
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn datetime_in_year(&mut self, year: i32) -> OffsetDateTime {
        let start = midnight_utc(year, Month::January, 1);
        let offset = self.rng.next_u64() % (365 * 24 * 60 * 60);
        start + Duration::seconds(offset as i64)
    }
}

/// Catalog seeded with `products` demo rows plus a few ratings each.
pub fn demo_catalog(seed: u64, products: usize) -> FakeCatalog {
    let mut faker = CatalogFaker::new(seed);
    let mut catalog = FakeCatalog::new(faker.categories(), faker.brands());
    for _ in 0..products {
        let product = faker.product();
        let rating_count = faker.int_n(6);
        let ratings = faker.ratings(rating_count);
        let id = product.id.clone();
        catalog.insert_external(product);
        catalog.set_ratings(&id, ratings);
    }
    catalog
}

pub fn sample_category(id: &str, name: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: name.to_owned(),
    }
}

pub fn sample_brand(id: &str, name: &str) -> Brand {
    Brand {
        id: BrandId::new(id),
        name: name.to_owned(),
    }
}

pub fn sample_product(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        slug: slugify(name),
        description: String::new(),
        image_url: String::new(),
        price,
        is_featured: false,
        category: sample_category("c-1", "Lighting"),
        brand: None,
        created_at: reference_now(),
        updated_at: reference_now(),
        deleted_at: None,
    }
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}

pub fn reference_now() -> OffsetDateTime {
    midnight_utc(REFERENCE_YEAR, Month::January, 1)
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    let date = Date::from_calendar_date(year, month, day).expect("valid calendar date");
    date.with_time(Time::MIDNIGHT).assume_utc()
}

/// Notifier that keeps every notice for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pub notices: Vec<Notice>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<&str> {
        self.notices
            .iter()
            .map(|notice| notice.message.as_str())
            .collect()
    }

    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices
            .iter()
            .filter(|notice| notice.level == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogFaker, demo_catalog, slugify};
    use std::collections::BTreeSet;

    #[test]
    fn new_deterministic_seed() {
        let mut left = CatalogFaker::new(42);
        let mut right = CatalogFaker::new(42);
        assert_eq!(left.product(), right.product());
    }

    #[test]
    fn product_references_known_category() {
        let mut faker = CatalogFaker::new(7);
        let categories = faker.categories();
        for _ in 0..20 {
            let product = faker.product();
            assert!(
                categories.contains(&product.category),
                "unknown category {:?}",
                product.category
            );
            assert!(product.price >= 1.0);
            assert!(!product.slug.is_empty());
        }
    }

    #[test]
    fn ratings_stay_in_range() {
        let mut faker = CatalogFaker::new(3);
        for rating in faker.ratings(50) {
            assert!((1..=5).contains(&rating.rating));
            assert!(!rating.user_name.is_empty());
        }
    }

    #[test]
    fn variety_across_seeds() {
        let names = (1..=8)
            .map(|seed| CatalogFaker::new(seed).product().name)
            .collect::<BTreeSet<_>>();
        assert!(names.len() > 1);
    }

    #[test]
    fn demo_catalog_has_requested_rows() {
        let catalog = demo_catalog(1, 25);
        assert_eq!(catalog.products().len(), 25);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Sleek  Desk Lamp!"), "sleek-desk-lamp");
        assert_eq!(slugify("  --  "), "");
    }
}

//! Static city -> region table used to bucket professionals geographically.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// Regions in display order.
pub const REGIONS: [&str; 7] = [
    "צפון",
    "חיפה והקריות",
    "שרון",
    "מרכז",
    "ירושלים",
    "שפלה",
    "דרום",
];

const CITY_REGIONS: &[(&str, &str)] = &[
    ("נצרת", "צפון"),
    ("טבריה", "צפון"),
    ("צפת", "צפון"),
    ("כרמיאל", "צפון"),
    ("עפולה", "צפון"),
    ("נהריה", "צפון"),
    ("עכו", "צפון"),
    ("מעלות-תרשיחא", "צפון"),
    ("קריית שמונה", "צפון"),
    ("בית שאן", "צפון"),
    ("מגדל העמק", "צפון"),
    ("יקנעם עילית", "צפון"),
    ("חיפה", "חיפה והקריות"),
    ("קריית אתא", "חיפה והקריות"),
    ("קריית ביאליק", "חיפה והקריות"),
    ("קריית מוצקין", "חיפה והקריות"),
    ("קריית ים", "חיפה והקריות"),
    ("טירת כרמל", "חיפה והקריות"),
    ("נשר", "חיפה והקריות"),
    ("נתניה", "שרון"),
    ("הרצליה", "שרון"),
    ("כפר סבא", "שרון"),
    ("רעננה", "שרון"),
    ("הוד השרון", "שרון"),
    ("רמת השרון", "שרון"),
    ("חדרה", "שרון"),
    ("אור עקיבא", "שרון"),
    ("תל אביב", "מרכז"),
    ("תל אביב-יפו", "מרכז"),
    ("רמת גן", "מרכז"),
    ("גבעתיים", "מרכז"),
    ("בני ברק", "מרכז"),
    ("פתח תקווה", "מרכז"),
    ("חולון", "מרכז"),
    ("בת ים", "מרכז"),
    ("ראשון לציון", "מרכז"),
    ("אור יהודה", "מרכז"),
    ("יהוד", "מרכז"),
    ("ראש העין", "מרכז"),
    ("אלעד", "מרכז"),
    ("שוהם", "מרכז"),
    ("ירושלים", "ירושלים"),
    ("בית שמש", "ירושלים"),
    ("מבשרת ציון", "ירושלים"),
    ("מעלה אדומים", "ירושלים"),
    ("אבו גוש", "ירושלים"),
    ("רחובות", "שפלה"),
    ("נס ציונה", "שפלה"),
    ("לוד", "שפלה"),
    ("רמלה", "שפלה"),
    ("מודיעין", "שפלה"),
    ("יבנה", "שפלה"),
    ("גדרה", "שפלה"),
    ("קריית עקרון", "שפלה"),
    ("באר שבע", "דרום"),
    ("אשדוד", "דרום"),
    ("אשקלון", "דרום"),
    ("אילת", "דרום"),
    ("דימונה", "דרום"),
    ("קריית גת", "דרום"),
    ("שדרות", "דרום"),
    ("נתיבות", "דרום"),
    ("אופקים", "דרום"),
    ("ערד", "דרום"),
];

fn index() -> &'static HashMap<&'static str, &'static str> {
    static INDEX: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| CITY_REGIONS.iter().copied().collect())
}

pub fn region_of(city: &str) -> Option<&'static str> {
    index().get(city.trim()).copied()
}

pub fn cities_of(region: &str) -> BTreeSet<&'static str> {
    let region = region.trim();
    CITY_REGIONS
        .iter()
        .filter(|(_, r)| *r == region)
        .map(|(city, _)| *city)
        .collect()
}

/// All known cities, sorted.
pub fn all_cities() -> Vec<&'static str> {
    let mut cities = CITY_REGIONS.iter().map(|(city, _)| *city).collect::<Vec<_>>();
    cities.sort_unstable();
    cities
}

pub fn all_regions() -> Vec<&'static str> {
    REGIONS.to_vec()
}

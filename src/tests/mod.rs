
mod apk_cases;
mod axml_cases;

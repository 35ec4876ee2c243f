//! Analysis prompt construction
//!
//! The template text is fixed. Rows collected by different operators are
//! only comparable if the same `(category, code)` yields the same bytes.

use crate::catalog::ErrorDefinition;

/// Build the five-section analysis prompt for one error
pub fn build_prompt(error: &ErrorDefinition) -> String {
    format!(
        "Aşağıdaki yazılım hatasını analiz edin ve detaylı bir çözüm önerisi sunun:

Hata Kategorisi: {category_name} ({category})
Hata Kodu: {code}
Hata Adı: {name}
Hata Mesajı: {message}

Lütfen aşağıdaki başlıklar altında analiz yapın:

1. Hatanın Nedeni: Bu hatanın oluşma sebepleri nelerdir?
2. Hata Senaryosu: Hangi durumlarda bu hata ile karşılaşılır?
3. Çözüm Önerileri: Bu hatayı nasıl çözebiliriz? (Adım adım)
4. Önleme Yöntemleri: Gelecekte bu hatanın oluşmasını nasıl engelleriz?
5. Best Practices: İlgili konuda en iyi uygulamalar nelerdir?",
        category_name = error.category_name,
        category = error.category,
        code = error.code,
        name = error.name,
        message = error.message,
    )
}

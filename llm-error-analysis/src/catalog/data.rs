//! Built-in error catalog
//!
//! Entries are kept verbatim: prompts built from them must stay
//! byte-identical across operators so merged datasets remain comparable.

use super::{CategoryDef, ErrorEntry};

const fn entry(code: &'static str, name: &'static str, message: &'static str) -> ErrorEntry {
    ErrorEntry { code, name, message }
}

pub(super) static BUILTIN_CATEGORIES: &[CategoryDef] = &[
    CategoryDef {
        key: "API_ERR",
        name: "API Hataları",
        errors: &[
            entry("400", "Bad Request", "İstek formatı hatalı veya eksik parametreler mevcut"),
            entry("401", "Unauthorized", "Kimlik doğrulama başarısız, geçersiz veya eksik token"),
            entry("403", "Forbidden", "Yetkisiz erişim, kullanıcı bu kaynağa erişim iznine sahip değil"),
            entry("404", "Not Found", "İstenen kaynak bulunamadı"),
            entry("405", "Method Not Allowed", "HTTP metodu bu endpoint için desteklenmiyor"),
            entry("500", "Internal Server Error", "Sunucu tarafında beklenmeyen bir hata oluştu"),
            entry("502", "Bad Gateway", "Upstream sunucudan geçersiz yanıt alındı"),
            entry("503", "Service Unavailable", "Servis geçici olarak kullanılamıyor, sunucu aşırı yüklü"),
            entry("504", "Gateway Timeout", "Upstream sunucu zamanında yanıt vermedi"),
            entry("429", "Too Many Requests", "Rate limit aşıldı, çok fazla istek gönderildi"),
        ],
    },
    CategoryDef {
        key: "AUTO_ERR",
        name: "Otomasyon Hataları",
        errors: &[
            entry("NoSuchElementException", "NoSuchElementException", "Belirtilen element sayfada bulunamadı"),
            entry("TimeoutException", "TimeoutException", "Element belirtilen süre içinde görünmedi veya etkileşime hazır hale gelmedi"),
            entry("StaleElementReferenceException", "StaleElementReferenceException", "Element DOM'dan kaldırılmış veya yenilenmiş, referans geçersiz"),
            entry("ElementClickInterceptedException", "ElementClickInterceptedException", "Başka bir element tıklamayı engelliyor, overlay veya modal olabilir"),
            entry("ElementNotInteractableException", "ElementNotInteractableException", "Element görünür ancak etkileşime kapalı durumda"),
            entry("SessionNotFoundException", "SessionNotFoundException", "WebDriver session'ı sonlandırılmış veya bulunamıyor"),
            entry("InvalidSelectorException", "InvalidSelectorException", "CSS veya XPath selector formatı geçersiz"),
            entry("WebDriverException", "WebDriverException", "WebDriver ile iletişim kurulamadı veya genel driver hatası"),
        ],
    },
    CategoryDef {
        key: "BROWSER_ERR",
        name: "Tarayıcı Hataları",
        errors: &[
            entry("BrowserNotReachableException", "BrowserNotReachableException", "Tarayıcı sürecine erişilemiyor, çökmüş olabilir"),
            entry("BrowserCrashDetected", "BrowserCrashDetected", "Tarayıcı beklenmedik şekilde çöktü"),
            entry("TabCrashedError", "TabCrashedError", "Aktif sekme çöktü, içerik render edilemiyor"),
            entry("WebGLNotSupported", "WebGLNotSupported", "Tarayıcı WebGL desteklemiyor veya devre dışı"),
            entry("UnsupportedBrowserFeature", "UnsupportedBrowserFeature", "Kullanılan özellik bu tarayıcı versiyonunda desteklenmiyor"),
        ],
    },
    CategoryDef {
        key: "CODE_ERR",
        name: "Kodlama Hataları",
        errors: &[
            entry("NullPointerException", "NullPointerException", "Null referansa erişim denemesi, nesne başlatılmamış"),
            entry("ArrayIndexOutOfBoundsException", "ArrayIndexOutOfBoundsException", "Dizi sınırları dışında index erişimi"),
            entry("ClassCastException", "ClassCastException", "Geçersiz tip dönüşümü, uyumsuz sınıflar arası cast"),
            entry("IllegalArgumentException", "IllegalArgumentException", "Fonksiyona geçersiz veya beklenmeyen parametre değeri"),
            entry("IllegalStateException", "IllegalStateException", "Nesne geçersiz durumda, işlem bu state'te yapılamaz"),
            entry("AssertionError", "AssertionError", "Test assertion başarısız, beklenen değer ile gerçek değer uyuşmuyor"),
            entry("ConcurrentModificationException", "ConcurrentModificationException", "Koleksiyon iterasyon sırasında değiştirildi"),
        ],
    },
    CategoryDef {
        key: "CONFIG_ERR",
        name: "Yapılandırma Hataları",
        errors: &[
            entry("MissingConfigurationFile", "MissingConfigurationFile", "Gerekli yapılandırma dosyası bulunamadı"),
            entry("InvalidEnvironmentVariable", "InvalidEnvironmentVariable", "Ortam değişkeni eksik veya geçersiz formatta"),
            entry("IncorrectDriverVersion", "IncorrectDriverVersion", "WebDriver versiyonu tarayıcı versiyonu ile uyumsuz"),
            entry("MisconfiguredTestSetup", "MisconfiguredTestSetup", "Test yapılandırması hatalı, eksik parametreler mevcut"),
            entry("MissingDependencies", "MissingDependencies", "Gerekli bağımlılıklar yüklenmemiş veya bulunamıyor"),
        ],
    },
    CategoryDef {
        key: "DATA_ERR",
        name: "Veri Hataları",
        errors: &[
            entry("TestDataMissing", "TestDataMissing", "Test verisi bulunamadı veya dosya okunamadı"),
            entry("DataTypeMismatch", "DataTypeMismatch", "Veri tipi uyuşmuyor, string beklenirken number geldi"),
            entry("ConstraintViolationOnInsert", "ConstraintViolationOnInsert", "Veritabanı kısıtlaması ihlal edildi, unique constraint hatası"),
            entry("MandatoryFieldEmpty", "MandatoryFieldEmpty", "Zorunlu alan boş bırakılamaz"),
            entry("DuplicateDataDetected", "DuplicateDataDetected", "Aynı veri zaten mevcut, tekrarlanan kayıt"),
        ],
    },
    CategoryDef {
        key: "DB_ERR",
        name: "Veritabanı Hataları",
        errors: &[
            entry("SQLSyntaxErrorException", "SQLSyntaxErrorException", "SQL sorgu sözdizimi hatası"),
            entry("SQLIntegrityConstraintViolationException", "SQLIntegrityConstraintViolationException", "Foreign key veya unique constraint ihlali"),
            entry("ConnectionRefused", "ConnectionRefused", "Veritabanı bağlantısı reddedildi, sunucu erişilemiyor"),
            entry("DeadlockDetected", "DeadlockDetected", "Veritabanı deadlock tespit edildi, transaction geri alındı"),
            entry("QueryTimeoutException", "QueryTimeoutException", "Sorgu maksimum süre içinde tamamlanamadı"),
            entry("DatabaseLockedError", "DatabaseLockedError", "Veritabanı kilitli, yazma işlemi yapılamıyor"),
            entry("PrimaryKeyViolation", "PrimaryKeyViolation", "Primary key constraint ihlali, aynı ID zaten var"),
        ],
    },
    CategoryDef {
        key: "ENV_ERR",
        name: "Çevresel Hatalar",
        errors: &[
            entry("ServerDown", "ServerDown", "Test sunucusu yanıt vermiyor veya kapalı"),
            entry("EnvironmentNotReachable", "EnvironmentNotReachable", "Test ortamına erişilemiyor, network veya VPN problemi"),
            entry("DNSResolutionError", "DNSResolutionError", "DNS çözümlenemedi, domain bulunamadı"),
            entry("SSLHandshakeException", "SSLHandshakeException", "SSL sertifika doğrulama hatası"),
            entry("ConnectionTimeout", "ConnectionTimeout", "Bağlantı zaman aşımına uğradı"),
            entry("ResourceUnavailable", "ResourceUnavailable", "Gerekli kaynak kullanılamıyor veya meşgul"),
        ],
    },
    CategoryDef {
        key: "NET_ERR",
        name: "Ağ Hataları",
        errors: &[
            entry("ConnectionReset", "ConnectionReset", "Bağlantı karşı tarafça sıfırlandı"),
            entry("SocketTimeoutException", "SocketTimeoutException", "Socket okuma/yazma zaman aşımı"),
            entry("HostUnreachable", "HostUnreachable", "Hedef host'a erişilemiyor, routing problemi"),
            entry("NetworkInterfaceDown", "NetworkInterfaceDown", "Ağ arayüzü devre dışı veya bağlantı yok"),
            entry("PacketLossDetected", "PacketLossDetected", "Yüksek paket kaybı tespit edildi"),
            entry("TLSHandshakeFailure", "TLSHandshakeFailure", "TLS handshake başarısız, protokol uyumsuzluğu"),
        ],
    },
    CategoryDef {
        key: "PERF_ERR",
        name: "Performans Hataları",
        errors: &[
            entry("SlowResponseDetected", "SlowResponseDetected", "Yanıt süresi kabul edilebilir limitin üzerinde"),
            entry("DatabaseTimeout", "DatabaseTimeout", "Veritabanı sorgusu çok uzun sürdü"),
            entry("APIResponseDelay", "APIResponseDelay", "API yanıt süresi SLA'yı aşıyor"),
            entry("HighMemoryUsage", "HighMemoryUsage", "Bellek kullanımı kritik seviyede"),
            entry("CPUOverload", "CPUOverload", "CPU kullanımı %90'ın üzerinde"),
            entry("DiskSpaceLow", "DiskSpaceLow", "Disk alanı yetersiz, kritik eşik aşıldı"),
        ],
    },
    CategoryDef {
        key: "SEC_ERR",
        name: "Güvenlik Hataları",
        errors: &[
            entry("AuthenticationFailure", "AuthenticationFailure", "Kullanıcı kimlik doğrulaması başarısız"),
            entry("AuthorizationFailure", "AuthorizationFailure", "Kullanıcı bu işlem için yetkilendirilmemiş"),
            entry("TokenExpired", "TokenExpired", "Authentication token süresi dolmuş"),
            entry("TokenInvalid", "TokenInvalid", "Token formatı geçersiz veya imza doğrulanamadı"),
            entry("CrossSiteRequestForgery", "CrossSiteRequestForgery", "CSRF token eksik veya geçersiz"),
            entry("CrossSiteScriptingDetected", "CrossSiteScriptingDetected", "XSS saldırı girişimi tespit edildi"),
        ],
    },
    CategoryDef {
        key: "VERSION_ERR",
        name: "Sürüm Uyumsuzluğu Hataları",
        errors: &[
            entry("IncompatibleDriverVersion", "IncompatibleDriverVersion", "Driver versiyonu browser versiyonu ile uyumsuz"),
            entry("UnsupportedBrowserVersion", "UnsupportedBrowserVersion", "Browser versiyonu desteklenmiyor, güncelleme gerekli"),
            entry("OutdatedFrameworkVersion", "OutdatedFrameworkVersion", "Test framework versiyonu eski, yeni API'ler kullanılamıyor"),
            entry("DeprecatedAPI", "DeprecatedAPI", "Kullanılan API deprecated edilmiş, alternatif kullanılmalı"),
        ],
    },
];

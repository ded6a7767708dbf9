//! Namespace, algorithm and element-name constants used by the signature layer.

/// XML namespace URIs
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Algorithm URIs
pub const XMLDSIG_ENVELOPED_SIGNATURE: &str =
    "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub const RSA_SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const SHA256_DIGEST_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const EXCLUSIVE_C14N_ALGORITHM: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML element names
pub const SIGNATURE_ELEMENT: &str = "Signature";
pub const SIGNED_INFO_ELEMENT: &str = "SignedInfo";
pub const CANONICALIZATION_METHOD_ELEMENT: &str = "CanonicalizationMethod";
pub const SIGNATURE_METHOD_ELEMENT: &str = "SignatureMethod";
pub const REFERENCE_ELEMENT: &str = "Reference";
pub const TRANSFORMS_ELEMENT: &str = "Transforms";
pub const TRANSFORM_ELEMENT: &str = "Transform";
pub const DIGEST_METHOD_ELEMENT: &str = "DigestMethod";
pub const DIGEST_VALUE_ELEMENT: &str = "DigestValue";
pub const SIGNATURE_VALUE_ELEMENT: &str = "SignatureValue";
pub const KEY_INFO_ELEMENT: &str = "KeyInfo";
pub const KEY_NAME_ELEMENT: &str = "KeyName";
pub const X509_DATA_ELEMENT: &str = "X509Data";
pub const X509_CERTIFICATE_ELEMENT: &str = "X509Certificate";

/// XML attribute names
pub const ALGORITHM_ATTRIBUTE: &str = "Algorithm";
pub const URI_ATTRIBUTE: &str = "URI";

//! Built-in reference lists used when a list has no source file.

/// Common first names.
pub const NAMES: &[&str] = &[
    "Anvi", "Charles", "Daniel", "David", "Elizabeth", "Gayatri", "George", "Henry", "James",
    "Jennifer", "Jessica", "John", "Joseph", "Karen", "Linda", "Lisa", "Mary", "Michael",
    "Nancy", "Patricia", "Richard", "Robert", "Sarah", "Susan", "Thomas", "William",
];

/// ISO 3166-1 countries by common short name.
pub const COUNTRIES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola", "Antigua and Barbuda",
    "Argentina", "Armenia", "Australia", "Austria", "Azerbaijan", "Bahamas", "Bahrain",
    "Bangladesh", "Barbados", "Belarus", "Belgium", "Belize", "Benin", "Bhutan", "Bolivia",
    "Bosnia and Herzegovina", "Botswana", "Brazil", "Brunei", "Bulgaria", "Burkina Faso",
    "Burundi", "Cabo Verde", "Cambodia", "Cameroon", "Canada", "Central African Republic",
    "Chad", "Chile", "China", "Colombia", "Comoros", "Congo", "Costa Rica", "Côte d'Ivoire",
    "Croatia", "Cuba", "Cyprus", "Czechia", "Democratic Republic of the Congo", "Denmark",
    "Djibouti", "Dominica", "Dominican Republic", "Ecuador", "Egypt", "El Salvador",
    "Equatorial Guinea", "Eritrea", "Estonia", "Eswatini", "Ethiopia", "Fiji", "Finland",
    "France", "Gabon", "Gambia", "Georgia", "Germany", "Ghana", "Greece", "Grenada",
    "Guatemala", "Guinea", "Guinea-Bissau", "Guyana", "Haiti", "Honduras", "Hungary",
    "Iceland", "India", "Indonesia", "Iran", "Iraq", "Ireland", "Israel", "Italy", "Jamaica",
    "Japan", "Jordan", "Kazakhstan", "Kenya", "Kiribati", "Kuwait", "Kyrgyzstan", "Laos",
    "Latvia", "Lebanon", "Lesotho", "Liberia", "Libya", "Liechtenstein", "Lithuania",
    "Luxembourg", "Madagascar", "Malawi", "Malaysia", "Maldives", "Mali", "Malta",
    "Marshall Islands", "Mauritania", "Mauritius", "Mexico", "Micronesia", "Moldova",
    "Monaco", "Mongolia", "Montenegro", "Morocco", "Mozambique", "Myanmar", "Namibia",
    "Nauru", "Nepal", "Netherlands", "New Zealand", "Nicaragua", "Niger", "Nigeria",
    "North Korea", "North Macedonia", "Norway", "Oman", "Pakistan", "Palau", "Palestine",
    "Panama", "Papua New Guinea", "Paraguay", "Peru", "Philippines", "Poland", "Portugal",
    "Qatar", "Romania", "Russia", "Rwanda", "Saint Kitts and Nevis", "Saint Lucia",
    "Saint Vincent and the Grenadines", "Samoa", "San Marino", "Sao Tome and Principe",
    "Saudi Arabia", "Senegal", "Serbia", "Seychelles", "Sierra Leone", "Singapore",
    "Slovakia", "Slovenia", "Solomon Islands", "Somalia", "South Africa", "South Korea",
    "South Sudan", "Spain", "Sri Lanka", "Sudan", "Suriname", "Sweden", "Switzerland",
    "Syria", "Taiwan", "Tajikistan", "Tanzania", "Thailand", "Timor-Leste", "Togo", "Tonga",
    "Trinidad and Tobago", "Tunisia", "Turkey", "Turkmenistan", "Tuvalu", "Uganda",
    "Ukraine", "United Arab Emirates", "United Kingdom", "United States", "Uruguay",
    "Uzbekistan", "Vanuatu", "Vatican City", "Venezuela", "Vietnam", "Yemen", "Zambia",
    "Zimbabwe",
];

/// Large cities, national capitals first where they are also the largest.
pub const CITIES: &[&str] = &[
    "Abu Dhabi", "Accra", "Addis Ababa", "Ahmedabad", "Amsterdam", "Ankara", "Athens",
    "Atlanta", "Auckland", "Baghdad", "Bangalore", "Bangkok", "Barcelona", "Beijing",
    "Beirut", "Belgrade", "Berlin", "Bogotá", "Boston", "Brasília", "Brussels", "Bucharest",
    "Budapest", "Buenos Aires", "Cairo", "Cape Town", "Caracas", "Casablanca", "Chennai",
    "Chicago", "Copenhagen", "Dallas", "Dhaka", "Delhi", "Dubai", "Dublin", "Frankfurt",
    "Guangzhou", "Hamburg", "Hanoi", "Havana", "Helsinki", "Ho Chi Minh City", "Hong Kong",
    "Houston", "Hyderabad", "Istanbul", "Jakarta", "Jeddah", "Johannesburg", "Karachi",
    "Kathmandu", "Kyiv", "Kolkata", "Kuala Lumpur", "Lagos", "Lahore", "Lima", "Lisbon",
    "London", "Los Angeles", "Madrid", "Manila", "Melbourne", "Mexico City", "Miami",
    "Milan", "Montreal", "Moscow", "Mumbai", "Munich", "Nairobi", "New Delhi", "New York",
    "Osaka", "Oslo", "Paris", "Philadelphia", "Prague", "Pune", "Riyadh", "Rio de Janeiro",
    "Rome", "San Francisco", "Santiago", "São Paulo", "Seattle", "Seoul", "Shanghai",
    "Shenzhen", "Singapore", "Stockholm", "Sydney", "Taipei", "Tehran", "Tel Aviv", "Tokyo",
    "Toronto", "Vancouver", "Vienna", "Warsaw", "Washington", "Zurich",
];
